use fig_core::constants::codes;
use fig_core::container::Container;
use fig_core::document::{
    Alignment, Arc, ArcDirection, ArcKind, Arrow, Compound, Document, Ellipse, EllipseShape,
    Object, PageSettings, Picture, Polyline, PolylineKind, Spline, SplineKind, Style, Text,
};
use fig_core::geometry::Point;
use glam::{DVec2, IVec2};
use tracing::{debug, info, trace, warn};

use crate::FigError;

/// 每行最多的坐标对数量。
const POINTS_PER_LINE: usize = 6;
/// 每行最多的形状因子数量。
const FACTORS_PER_LINE: usize = 8;

#[derive(Debug, Clone, Copy)]
struct SourceLine<'a> {
    number: usize,
    text: &'a str,
}

impl<'a> SourceLine<'a> {
    fn error(&self, reason: impl Into<String>) -> FigError {
        FigError::Format {
            line: self.number,
            content: self.text.to_string(),
            reason: reason.into(),
        }
    }
}

/// 跳过注释与空行，行号按物理行计数。
struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> LineReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line_number: 0,
        }
    }

    fn next_line(&mut self) -> Option<SourceLine<'a>> {
        for text in self.lines.by_ref() {
            self.line_number += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(SourceLine {
                number: self.line_number,
                text,
            });
        }
        None
    }

    fn expect_line(&mut self, reason: &str) -> Result<SourceLine<'a>, FigError> {
        self.next_line().ok_or_else(|| FigError::UnexpectedEof {
            line: self.line_number,
            reason: reason.to_string(),
        })
    }
}

/// 已按空白拆分的一行字段。
struct Record<'a> {
    line: SourceLine<'a>,
    tokens: Vec<&'a str>,
}

impl<'a> Record<'a> {
    fn new(line: SourceLine<'a>, expected: usize, what: &str) -> Result<Self, FigError> {
        let tokens: Vec<&'a str> = line.text.split_whitespace().collect();
        if tokens.len() != expected {
            return Err(line.error(format!(
                "{what} 需要 {expected} 个字段，实际为 {}",
                tokens.len()
            )));
        }
        Ok(Self { line, tokens })
    }

    fn token(&self, index: usize, field: &str) -> Result<&'a str, FigError> {
        self.tokens
            .get(index)
            .copied()
            .ok_or_else(|| self.line.error(format!("缺少字段 {field}")))
    }

    fn int(&self, index: usize, field: &str) -> Result<i32, FigError> {
        let raw = self.token(index, field)?;
        raw.parse::<i32>()
            .map_err(|_| self.line.error(format!("{field} 解析失败（值：\"{raw}\"）")))
    }

    fn float(&self, index: usize, field: &str) -> Result<f64, FigError> {
        let raw = self.token(index, field)?;
        raw.parse::<f64>()
            .map_err(|_| self.line.error(format!("{field} 解析失败（值：\"{raw}\"）")))
    }

    fn flag(&self, index: usize, field: &str) -> Result<bool, FigError> {
        Ok(self.int(index, field)? != 0)
    }

    fn count(&self, index: usize, field: &str) -> Result<usize, FigError> {
        let value = self.int(index, field)?;
        usize::try_from(value).map_err(|_| self.line.error(format!("{field} 不能为负数（值：{value}）")))
    }

    fn point(&self, index: usize, field: &str) -> Result<Point, FigError> {
        Ok(Point::new(self.int(index, field)?, self.int(index + 1, field)?))
    }

    /// 字段 2..=9 为所有图元共享的样式部分。
    fn style(&self) -> Result<Style, FigError> {
        Ok(Style {
            line_style: self.int(2, "线型")?,
            line_width: self.int(3, "线宽")?,
            pen_color: self.int(4, "画笔颜色")?,
            fill_color: self.int(5, "填充颜色")?,
            depth: self.int(6, "深度")?,
            pen_style: self.int(7, "画笔样式")?,
            fill_style: self.int(8, "填充样式")?,
            style_value: self.float(9, "样式值")?,
            ..Style::default()
        })
    }
}

/// 取出前 `count` 个字段，返回其后（跳过一个分隔符）的剩余文本。
fn split_fields(text: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = text;
    while fields.len() < count {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = &rest[end..];
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some(separator) if separator.is_whitespace() => Some((fields, chars.as_str())),
        _ => Some((fields, rest)),
    }
}

fn keyword(text: &str, expected: &str) -> bool {
    text.trim().to_ascii_lowercase().starts_with(expected)
}

/// 逐行解析 FIG 文本。
pub struct FigParser<'a> {
    reader: LineReader<'a>,
}

impl<'a> FigParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: LineReader::new(source),
        }
    }

    pub fn parse(mut self) -> Result<Document, FigError> {
        let mut document = Document::new();
        self.parse_header(&mut document.page)?;

        let mut stack: Vec<Compound> = Vec::new();
        while let Some(line) = self.reader.next_line() {
            let first = line.text.split_whitespace().next().unwrap_or_default();
            let code = first
                .parse::<i32>()
                .map_err(|_| line.error(format!("对象代码 \"{first}\" 无法解析为整数")))?;

            let object = match code {
                codes::CUSTOM_COLOR => {
                    self.parse_custom_color(line, &mut document)?;
                    continue;
                }
                codes::ELLIPSE => Object::Ellipse(self.parse_ellipse(line)?),
                codes::POLYLINE => Object::Polyline(self.parse_polyline(line)?),
                codes::SPLINE => Object::Spline(self.parse_spline(line)?),
                codes::TEXT => Object::Text(self.parse_text(line)?),
                codes::ARC => Object::Arc(self.parse_arc(line)?),
                codes::COMPOUND_BEGIN => {
                    let record = Record::new(line, 5, "组合起始")?;
                    // 文件中的包围盒仅作校验，写出时重新计算
                    record.point(1, "组合包围盒")?;
                    record.point(3, "组合包围盒")?;
                    stack.push(Compound::new());
                    debug!(depth = stack.len(), line = line.number, "进入组合");
                    continue;
                }
                codes::COMPOUND_END => {
                    Record::new(line, 1, "组合结束")?;
                    let compound = stack
                        .pop()
                        .ok_or_else(|| line.error("组合结束标记没有对应的起始"))?;
                    debug!(depth = stack.len(), children = compound.len(), "离开组合");
                    Object::Compound(compound)
                }
                other => return Err(line.error(format!("未知的对象代码 {other}"))),
            };

            match stack.last_mut() {
                Some(parent) => parent.push(object),
                None => document.append(object),
            }
        }

        if !stack.is_empty() {
            return Err(FigError::UnexpectedEof {
                line: self.reader.line_number,
                reason: format!("{} 个组合未结束", stack.len()),
            });
        }

        info!(
            objects = document.all_objects(false).count(),
            colors = document.colors().len(),
            "FIG 文档解析完成"
        );
        Ok(document)
    }

    fn header_line(&mut self, field: &str) -> Result<SourceLine<'a>, FigError> {
        self.reader.expect_line(&format!("文件头缺少{field}"))
    }

    fn parse_header(&mut self, page: &mut PageSettings) -> Result<(), FigError> {
        page.landscape = keyword(self.header_line("方向")?.text, "landscape");
        page.centered = keyword(self.header_line("对齐方式")?.text, "center");
        page.metric = keyword(self.header_line("单位")?.text, "metric");
        page.paper_size = self.header_line("纸张尺寸")?.text.trim().to_string();

        let magnification = Record::new(self.header_line("缩放比例")?, 1, "缩放比例")?;
        page.magnification = magnification.float(0, "缩放比例")?;

        page.single_page = keyword(self.header_line("页面模式")?.text, "single");

        let transparent = Record::new(self.header_line("透明色")?, 1, "透明色")?;
        page.transparent_color = transparent.int(0, "透明色")?;

        let resolution = Record::new(self.header_line("分辨率")?, 2, "分辨率")?;
        page.resolution = resolution.int(0, "分辨率")?;
        resolution.int(1, "坐标系")?;

        debug!(?page, "文件头解析完成");
        Ok(())
    }

    fn parse_custom_color(
        &mut self,
        line: SourceLine<'a>,
        document: &mut Document,
    ) -> Result<(), FigError> {
        let record = Record::new(line, 3, "自定义颜色")?;
        let index = record.int(1, "颜色编号")?;
        let expected = document.colors().next_index();
        if index != expected {
            warn!(
                line = line.number,
                index,
                expected,
                "自定义颜色编号不连续，按登记顺序重新编号"
            );
        }
        let hex = record.token(2, "颜色值")?;
        let color = document
            .colors_mut()
            .add_color(hex)
            .map_err(|err| line.error(err.to_string()))?;
        debug!(index = color.index, hex = %color.hex(), "自定义颜色");
        Ok(())
    }

    fn parse_ellipse(&mut self, line: SourceLine<'a>) -> Result<Ellipse, FigError> {
        let record = Record::new(line, 20, "椭圆")?;
        let subtype = record.int(1, "椭圆子类型")?;
        let shape = EllipseShape::from_code(subtype)
            .ok_or_else(|| line.error(format!("未知的椭圆子类型 {subtype}")))?;
        // 方向字段固定为 1，读入时忽略
        record.int(10, "椭圆方向")?;
        let ellipse = Ellipse {
            shape,
            style: record.style()?,
            angle: record.float(11, "椭圆角度")?,
            center: record.point(12, "椭圆中心")?,
            radius: IVec2::new(record.int(14, "椭圆半径")?, record.int(15, "椭圆半径")?),
            start: record.point(16, "椭圆起点")?,
            end: record.point(18, "椭圆终点")?,
        };
        debug!(?shape, line = line.number, "椭圆");
        Ok(ellipse)
    }

    fn parse_polyline(&mut self, line: SourceLine<'a>) -> Result<Polyline, FigError> {
        let record = Record::new(line, 16, "折线")?;
        let subtype = record.int(1, "折线子类型")?;
        let kind = PolylineKind::from_code(subtype)
            .ok_or_else(|| line.error(format!("未知的折线子类型 {subtype}")))?;
        let mut style = record.style()?;
        style.join_style = record.int(10, "连接样式")?;
        style.cap_style = record.int(11, "端点样式")?;
        let corner_radius = record.int(12, "圆角半径")?;
        let forward = record.flag(13, "前向箭头")?;
        let backward = record.flag(14, "后向箭头")?;
        let count = record.count(15, "点数")?;

        self.parse_arrows(&mut style, forward, backward)?;
        let picture = if kind == PolylineKind::Picture {
            Some(self.parse_picture()?)
        } else {
            None
        };
        let mut points = self.parse_points(count)?;
        if kind.is_closed() {
            if points.len() > 1 && points.first() != points.last() {
                warn!(line = line.number, ?kind, "闭合折线的末点与首点不一致");
            }
            points.pop();
        }

        debug!(?kind, points = points.len(), line = line.number, "折线");
        Ok(Polyline {
            kind,
            style,
            points,
            corner_radius,
            picture,
        })
    }

    fn parse_spline(&mut self, line: SourceLine<'a>) -> Result<Spline, FigError> {
        let record = Record::new(line, 14, "样条")?;
        let subtype = record.int(1, "样条子类型")?;
        let (kind, closed) = SplineKind::from_code(subtype)
            .ok_or_else(|| line.error(format!("未知的样条子类型 {subtype}")))?;
        let mut style = record.style()?;
        style.cap_style = record.int(10, "端点样式")?;
        let forward = record.flag(11, "前向箭头")?;
        let backward = record.flag(12, "后向箭头")?;
        let count = record.count(13, "点数")?;

        self.parse_arrows(&mut style, forward, backward)?;
        let points = self.parse_points(count)?;
        let shape_factors = self.parse_shape_factors(count)?;

        debug!(?kind, closed, points = points.len(), line = line.number, "样条");
        Ok(Spline {
            kind,
            closed,
            style,
            points,
            shape_factors,
        })
    }

    fn parse_arc(&mut self, line: SourceLine<'a>) -> Result<Arc, FigError> {
        let record = Record::new(line, 22, "圆弧")?;
        let subtype = record.int(1, "圆弧子类型")?;
        let kind = ArcKind::from_code(subtype)
            .ok_or_else(|| line.error(format!("未知的圆弧子类型 {subtype}")))?;
        let mut style = record.style()?;
        style.cap_style = record.int(10, "端点样式")?;
        let direction_code = record.int(11, "圆弧方向")?;
        let direction = ArcDirection::from_code(direction_code)
            .ok_or_else(|| line.error(format!("未知的圆弧方向 {direction_code}")))?;
        let forward = record.flag(12, "前向箭头")?;
        let backward = record.flag(13, "后向箭头")?;
        let center = DVec2::new(record.float(14, "圆心 X")?, record.float(15, "圆心 Y")?);
        let points = [
            record.point(16, "圆弧第一点")?,
            record.point(18, "圆弧第二点")?,
            record.point(20, "圆弧第三点")?,
        ];

        self.parse_arrows(&mut style, forward, backward)?;
        debug!(?kind, ?direction, line = line.number, "圆弧");
        Ok(Arc {
            kind,
            direction,
            style,
            center,
            points,
        })
    }

    fn parse_text(&mut self, line: SourceLine<'a>) -> Result<Text, FigError> {
        let (tokens, rest) =
            split_fields(line.text, 13).ok_or_else(|| line.error("文本记录需要 13 个字段"))?;
        let content = rest
            .trim_end()
            .strip_suffix("\\001")
            .ok_or_else(|| line.error("文本缺少 \\001 结束标记"))?;
        let record = Record { line, tokens };

        let alignment_code = record.int(1, "对齐方式")?;
        let alignment = Alignment::from_code(alignment_code)
            .ok_or_else(|| line.error(format!("未知的文本对齐方式 {alignment_code}")))?;
        let style = Style {
            pen_color: record.int(2, "画笔颜色")?,
            depth: record.int(3, "深度")?,
            pen_style: record.int(4, "画笔样式")?,
            ..Style::default()
        };
        let text = Text {
            style,
            alignment,
            position: record.point(11, "文本位置")?,
            text: content.to_string(),
            font: record.int(5, "字体")?,
            font_size: record.float(6, "字号")?,
            angle: record.float(7, "文本角度")?,
            font_flags: record.int(8, "字体标志")?,
            height: record.float(9, "文本高度")?,
            length: record.float(10, "文本长度")?,
        };
        debug!(?alignment, chars = text.text.chars().count(), line = line.number, "文本");
        Ok(text)
    }

    fn parse_arrows(
        &mut self,
        style: &mut Style,
        forward: bool,
        backward: bool,
    ) -> Result<(), FigError> {
        if forward {
            style.forward_arrow = Some(self.parse_arrow()?);
        }
        if backward {
            style.backward_arrow = Some(self.parse_arrow()?);
        }
        Ok(())
    }

    fn parse_arrow(&mut self) -> Result<Arrow, FigError> {
        let line = self.reader.expect_line("缺少箭头参数行")?;
        let record = Record::new(line, 5, "箭头")?;
        let arrow = Arrow {
            kind: record.int(0, "箭头类型")?,
            style: record.int(1, "箭头样式")?,
            thickness: record.float(2, "箭头线宽")?,
            width: record.float(3, "箭头宽度")?,
            height: record.float(4, "箭头高度")?,
        };
        trace!(line = line.number, ?arrow, "箭头");
        Ok(arrow)
    }

    fn parse_picture(&mut self) -> Result<Picture, FigError> {
        let line = self.reader.expect_line("缺少图片文件行")?;
        let (tokens, rest) =
            split_fields(line.text, 1).ok_or_else(|| line.error("图片行缺少翻转标记"))?;
        let record = Record { line, tokens };
        let flipped = record.flag(0, "图片翻转")?;
        let filename = rest.trim();
        if filename.is_empty() {
            return Err(line.error("图片行缺少文件名"));
        }
        trace!(line = line.number, flipped, filename, "图片");
        Ok(Picture {
            flipped,
            filename: filename.to_string(),
        })
    }

    /// 按坐标数量消费续行；行数取决于实际内容而非预先计算。
    fn parse_points(&mut self, count: usize) -> Result<Vec<Point>, FigError> {
        let expected = count * 2;
        let mut values: Vec<i32> = Vec::with_capacity(expected);
        while values.len() < expected {
            let line = self.reader.expect_line(&format!(
                "坐标不足：需要 {count} 个点，已读取 {} 个",
                values.len() / 2
            ))?;
            let tokens: Vec<&str> = line.text.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                return Err(line.error("坐标数量为奇数"));
            }
            if tokens.len() > POINTS_PER_LINE * 2 || values.len() + tokens.len() > expected {
                return Err(line.error(format!("坐标多于声明的 {count} 个点")));
            }
            let record = Record { line, tokens };
            for index in 0..record.tokens.len() {
                values.push(record.int(index, "坐标")?);
            }
            trace!(line = line.number, read = values.len() / 2, count, "坐标续行");
        }
        Ok(values
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect())
    }

    fn parse_shape_factors(&mut self, count: usize) -> Result<Vec<f64>, FigError> {
        let mut factors = Vec::with_capacity(count);
        while factors.len() < count {
            let line = self.reader.expect_line(&format!(
                "形状因子不足：需要 {count} 个，已读取 {} 个",
                factors.len()
            ))?;
            let tokens: Vec<&str> = line.text.split_whitespace().collect();
            if tokens.len() > FACTORS_PER_LINE || factors.len() + tokens.len() > count {
                return Err(line.error(format!("形状因子多于声明的 {count} 个")));
            }
            let record = Record { line, tokens };
            for index in 0..record.tokens.len() {
                factors.push(record.float(index, "形状因子")?);
            }
            trace!(line = line.number, read = factors.len(), count, "形状因子续行");
        }
        Ok(factors)
    }
}
