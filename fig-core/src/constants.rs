//! 文件格式中出现的编号常量。

/// 主记录行的首个字段（对象代码）。
pub mod codes {
    pub const CUSTOM_COLOR: i32 = 0;
    pub const ELLIPSE: i32 = 1;
    pub const POLYLINE: i32 = 2;
    pub const SPLINE: i32 = 3;
    pub const TEXT: i32 = 4;
    pub const ARC: i32 = 5;
    pub const COMPOUND_BEGIN: i32 = 6;
    pub const COMPOUND_END: i32 = -6;
}

pub mod line_style {
    pub const DEFAULT: i32 = -1;
    pub const SOLID: i32 = 0;
    pub const DASHED: i32 = 1;
    pub const DOTTED: i32 = 2;
    pub const DASH_DOTTED: i32 = 3;
    pub const DASH_DOUBLE_DOTTED: i32 = 4;
    pub const DASH_TRIPLE_DOTTED: i32 = 5;
}

pub mod fill_style {
    pub const NONE: i32 = -1;
    pub const BLACK: i32 = 0;
    pub const SOLID: i32 = 20;
    pub const LEFT_30: i32 = 41;
    pub const RIGHT_30: i32 = 42;
    pub const CROSSED_30: i32 = 43;
    pub const LEFT_45: i32 = 44;
    pub const RIGHT_45: i32 = 45;
    pub const CROSSED_45: i32 = 46;

    /// 0 = 黑色 .. 100 = 填充色，5% 一档。
    pub fn shaded(percent: u32) -> i32 {
        (percent.min(100) / 5) as i32
    }

    /// 0 = 填充色 .. 100 = 白色，5% 一档。
    pub fn tinted(percent: u32) -> i32 {
        SOLID + (percent.min(100) / 5) as i32
    }
}

pub mod cap_style {
    pub const BUTT: i32 = 0;
    pub const ROUND: i32 = 1;
    pub const PROJECTING: i32 = 2;
}

pub mod join_style {
    pub const MITER: i32 = 0;
    pub const BEVEL: i32 = 1;
    pub const ROUND: i32 = 2;
}

/// PostScript 字体编号，仅在字体标志包含 [`font_flags::POSTSCRIPT`] 时有效。
pub mod font {
    pub const DEFAULT: i32 = -1;
    pub const TIMES_ROMAN: i32 = 0;
    pub const TIMES_ITALIC: i32 = 1;
    pub const TIMES_BOLD: i32 = 2;
    pub const TIMES_BOLD_ITALIC: i32 = 3;
    pub const AVANT_GARDE_BOOK: i32 = 4;
    pub const AVANT_GARDE_BOOK_OBLIQUE: i32 = 5;
    pub const AVANT_GARDE_DEMI: i32 = 6;
    pub const AVANT_GARDE_DEMI_OBLIQUE: i32 = 7;
    pub const BOOKMAN_LIGHT: i32 = 8;
    pub const BOOKMAN_LIGHT_ITALIC: i32 = 9;
    pub const BOOKMAN_DEMI: i32 = 10;
    pub const BOOKMAN_DEMI_ITALIC: i32 = 11;
    pub const COURIER: i32 = 12;
    pub const COURIER_OBLIQUE: i32 = 13;
    pub const COURIER_BOLD: i32 = 14;
    pub const COURIER_BOLD_OBLIQUE: i32 = 15;
    pub const HELVETICA: i32 = 16;
    pub const HELVETICA_OBLIQUE: i32 = 17;
    pub const HELVETICA_BOLD: i32 = 18;
    pub const HELVETICA_BOLD_OBLIQUE: i32 = 19;
    pub const HELVETICA_NARROW: i32 = 20;
    pub const HELVETICA_NARROW_OBLIQUE: i32 = 21;
    pub const HELVETICA_NARROW_BOLD: i32 = 22;
    pub const HELVETICA_NARROW_BOLD_OBLIQUE: i32 = 23;
    pub const NEW_CENTURY_ROMAN: i32 = 24;
    pub const NEW_CENTURY_ITALIC: i32 = 25;
    pub const NEW_CENTURY_BOLD: i32 = 26;
    pub const NEW_CENTURY_BOLD_ITALIC: i32 = 27;
    pub const PALATINO_ROMAN: i32 = 28;
    pub const PALATINO_ITALIC: i32 = 29;
    pub const PALATINO_BOLD: i32 = 30;
    pub const PALATINO_BOLD_ITALIC: i32 = 31;
    pub const SYMBOL: i32 = 32;
    pub const ZAPF_CHANCERY_MEDIUM_ITALIC: i32 = 33;
    pub const ZAPF_DINGBATS: i32 = 34;
}

pub mod font_flags {
    pub const RIGID: i32 = 1;
    pub const SPECIAL: i32 = 2;
    pub const POSTSCRIPT: i32 = 4;
    pub const HIDDEN: i32 = 8;
}

pub const PAPER_SIZES: [&str; 15] = [
    "Letter", "Legal", "Ledger", "Tabloid", "A", "B", "C", "D", "E", "A4", "A3", "A2", "A1", "A0",
    "B5",
];
