use std::borrow::Cow;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fig_core::document::Document;
use fig_core::errors::CoreError;
use thiserror::Error;
use tracing::debug;

mod reader;
mod writer;

pub use reader::FigParser;
pub use writer::{FigWriter, WriterOptions, format_float};

#[derive(Debug, Error)]
pub enum FigError {
    #[error("line {line}: {reason} ({content:?})")]
    Format {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("unexpected end of input after line {line}: {reason}")]
    UnexpectedEof { line: usize, reason: String },
    #[error("failed to read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("document is not associated with a file")]
    MissingPath,
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, FigError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), FigError>;
}

/// 路径与流两种方式的读写入口。
#[derive(Debug, Clone, Default)]
pub struct FigFacade {
    options: WriterOptions,
}

impl FigFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriterOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn parse_str(&self, source: &str) -> Result<Document, FigError> {
        FigParser::new(source).parse()
    }

    pub fn read_from(&self, mut reader: impl Read) -> Result<Document, FigError> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.parse_str(&source)
    }

    pub fn write_string(&self, document: &Document) -> String {
        FigWriter::new(&self.options).write_document(document)
    }

    pub fn write_to(&self, document: &Document, mut writer: impl Write) -> Result<(), FigError> {
        writer.write_all(self.write_string(document).as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// 保存到 `path`；未指定时写回文档记录的文件名，成功后更新该文件名。
    pub fn save_document(
        &self,
        document: &mut Document,
        path: Option<&Path>,
    ) -> Result<PathBuf, FigError> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => document
                .filename()
                .map(Path::to_path_buf)
                .ok_or(FigError::MissingPath)?,
        };
        self.save(document, &target)?;
        document.set_filename(target.clone());
        Ok(target)
    }
}

impl DocumentLoader for FigFacade {
    fn load(&self, path: &Path) -> Result<Document, FigError> {
        let data = fs::read_to_string(path).map_err(|source| FigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = self.parse_str(&data)?;
        document.set_filename(path);
        debug!(path = %path.display(), "FIG 文件已载入");
        Ok(document)
    }
}

impl DocumentSaver for FigFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), FigError> {
        fs::write(path, self.write_string(document)).map_err(|source| FigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "FIG 文件已写出");
        Ok(())
    }
}

/// 规范化文本以便比较：去掉注释与空行，合并空白，浮点数去掉多余的零。
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.split_whitespace()
                .map(canonical_token)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn canonical_token(token: &str) -> Cow<'_, str> {
    if !token.contains('.') || token.parse::<f64>().is_err() {
        return Cow::Borrowed(token);
    }
    let trimmed = token.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => Cow::Borrowed("0"),
        other => Cow::Borrowed(other),
    }
}
