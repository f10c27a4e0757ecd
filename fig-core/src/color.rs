//! 颜色表：32 个固定标准色 + 按需增长的自定义色。
//!
//! 对象只通过整数编号引用颜色。自定义色编号从 [`CUSTOM_BASE`] 开始连续分配，
//! 注册后不会被移除。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

pub const DEFAULT: i32 = -1;
pub const BLACK: i32 = 0;
pub const BLUE: i32 = 1;
pub const GREEN: i32 = 2;
pub const CYAN: i32 = 3;
pub const RED: i32 = 4;
pub const MAGENTA: i32 = 5;
pub const YELLOW: i32 = 6;
pub const WHITE: i32 = 7;
pub const BLUE4: i32 = 8;
pub const BLUE3: i32 = 9;
pub const BLUE2: i32 = 10;
pub const LIGHT_BLUE: i32 = 11;
pub const GREEN4: i32 = 12;
pub const GREEN3: i32 = 13;
pub const GREEN2: i32 = 14;
pub const CYAN4: i32 = 15;
pub const CYAN3: i32 = 16;
pub const CYAN2: i32 = 17;
pub const RED4: i32 = 18;
pub const RED3: i32 = 19;
pub const RED2: i32 = 20;
pub const MAGENTA4: i32 = 21;
pub const MAGENTA3: i32 = 22;
pub const MAGENTA2: i32 = 23;
pub const BROWN4: i32 = 24;
pub const BROWN3: i32 = 25;
pub const BROWN2: i32 = 26;
pub const PINK4: i32 = 27;
pub const PINK3: i32 = 28;
pub const PINK2: i32 = 29;
pub const LIGHT_PINK: i32 = 30;
pub const GOLD: i32 = 31;
pub const CUSTOM_BASE: i32 = 32;

pub const STANDARD_COLORS: [[u8; 3]; 32] = [
    [0, 0, 0],
    [0, 0, 255],
    [0, 255, 0],
    [0, 255, 255],
    [255, 0, 0],
    [255, 0, 255],
    [255, 255, 0],
    [255, 255, 255],
    [0, 0, 144],
    [0, 0, 176],
    [0, 0, 208],
    [135, 206, 255],
    [0, 144, 0],
    [0, 176, 0],
    [0, 208, 0],
    [0, 144, 144],
    [0, 176, 176],
    [0, 208, 208],
    [144, 0, 0],
    [176, 0, 0],
    [208, 0, 0],
    [144, 0, 144],
    [176, 0, 176],
    [208, 0, 208],
    [128, 48, 0],
    [160, 64, 0],
    [192, 96, 0],
    [255, 128, 128],
    [255, 160, 160],
    [255, 192, 192],
    [255, 224, 224],
    [255, 215, 0],
];

/// 已注册的自定义色。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomColor {
    pub index: i32,
    pub rgb: [u8; 3],
}

impl CustomColor {
    /// `#rrggbb` 形式（小写）。
    pub fn hex(&self) -> String {
        format_hex(self.rgb)
    }
}

/// `get_color` 接受的颜色描述。
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// 0..=255 的整数分量。
    Rgb(i32, i32, i32),
    /// 0.0..=1.0 的浮点分量。
    RgbF(f64, f64, f64),
    Gray(i32),
    GrayF(f64),
    Hex(String),
}

impl ColorSpec {
    /// 规范化为小写 `#rrggbb`。
    pub fn to_rgb(&self) -> Result<[u8; 3], CoreError> {
        match self {
            ColorSpec::Rgb(r, g, b) => Ok([
                int_channel(*r, self)?,
                int_channel(*g, self)?,
                int_channel(*b, self)?,
            ]),
            ColorSpec::RgbF(r, g, b) => Ok([
                float_channel(*r, self)?,
                float_channel(*g, self)?,
                float_channel(*b, self)?,
            ]),
            ColorSpec::Gray(level) => {
                let level = int_channel(*level, self)?;
                Ok([level; 3])
            }
            ColorSpec::GrayF(level) => {
                let level = float_channel(*level, self)?;
                Ok([level; 3])
            }
            ColorSpec::Hex(hex) => parse_hex(hex),
        }
    }
}

fn int_channel(value: i32, spec: &ColorSpec) -> Result<u8, CoreError> {
    u8::try_from(value).map_err(|_| CoreError::InvalidColor(format!("{spec:?}")))
}

fn float_channel(value: f64, spec: &ColorSpec) -> Result<u8, CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::InvalidColor(format!("{spec:?}")));
    }
    Ok((value * 255.0).round() as u8)
}

impl From<(i32, i32, i32)> for ColorSpec {
    fn from((r, g, b): (i32, i32, i32)) -> Self {
        ColorSpec::Rgb(r, g, b)
    }
}

impl From<(f64, f64, f64)> for ColorSpec {
    fn from((r, g, b): (f64, f64, f64)) -> Self {
        ColorSpec::RgbF(r, g, b)
    }
}

impl From<[u8; 3]> for ColorSpec {
    fn from([r, g, b]: [u8; 3]) -> Self {
        ColorSpec::Rgb(r.into(), g.into(), b.into())
    }
}

impl From<i32> for ColorSpec {
    fn from(level: i32) -> Self {
        ColorSpec::Gray(level)
    }
}

impl From<f64> for ColorSpec {
    fn from(level: f64) -> Self {
        ColorSpec::GrayF(level)
    }
}

impl From<&str> for ColorSpec {
    fn from(hex: &str) -> Self {
        ColorSpec::Hex(hex.to_string())
    }
}

impl From<String> for ColorSpec {
    fn from(hex: String) -> Self {
        ColorSpec::Hex(hex)
    }
}

/// 严格解析 `#rrggbb`：恰好 7 个字符，`#` 开头，其后 6 个十六进制数字。
pub fn parse_hex(hex: &str) -> Result<[u8; 3], CoreError> {
    let invalid = || CoreError::InvalidColor(hex.to_string());
    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 7 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

pub fn format_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn squared_distance(a: [u8; 3], b: [u8; 3]) -> i64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = i64::from(*x) - i64::from(*y);
            d * d
        })
        .sum()
}

/// 文档拥有的自定义色表，序列化时仅保存有序列表，哈希索引在反序列化时重建。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CustomColor>", into = "Vec<CustomColor>")]
pub struct ColorRegistry {
    colors: Vec<CustomColor>,
    by_hex: HashMap<String, usize>,
}

impl From<Vec<CustomColor>> for ColorRegistry {
    fn from(colors: Vec<CustomColor>) -> Self {
        let mut by_hex = HashMap::new();
        for (position, color) in colors.iter().enumerate() {
            by_hex.entry(color.hex()).or_insert(position);
        }
        Self { colors, by_hex }
    }
}

impl From<ColorRegistry> for Vec<CustomColor> {
    fn from(registry: ColorRegistry) -> Self {
        registry.colors
    }
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// 下一个将被分配的编号。
    #[inline]
    pub fn next_index(&self) -> i32 {
        CUSTOM_BASE + self.colors.len() as i32
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &CustomColor> {
        self.colors.iter()
    }

    pub fn get(&self, index: i32) -> Option<&CustomColor> {
        let position = usize::try_from(index - CUSTOM_BASE).ok()?;
        self.colors.get(position)
    }

    /// 无条件分配下一个编号。若同一颜色已存在，哈希表仍指向最早注册的那一个。
    pub fn add_color(&mut self, hex: &str) -> Result<CustomColor, CoreError> {
        let rgb = parse_hex(hex)?;
        Ok(self.push(rgb))
    }

    fn push(&mut self, rgb: [u8; 3]) -> CustomColor {
        let color = CustomColor {
            index: self.next_index(),
            rgb,
        };
        self.by_hex.entry(color.hex()).or_insert(self.colors.len());
        self.colors.push(color.clone());
        color
    }

    /// 查找或分配颜色。
    ///
    /// - 精确命中时直接返回；
    /// - `similarity` 为 `Some(t)` 且 `t > 0` 时，返回 RGB 平方距离最小且小于 `t²`
    ///   的已有颜色（距离相同时取注册顺序靠前者），否则分配新颜色；
    /// - `similarity` 为 `Some(t)` 但 `t` 不大于 0 时，不分配，返回 `ColorNotFound`；
    /// - `similarity` 为 `None` 时直接分配。
    pub fn get_color(
        &mut self,
        spec: impl Into<ColorSpec>,
        similarity: Option<f64>,
    ) -> Result<CustomColor, CoreError> {
        let rgb = spec.into().to_rgb()?;
        let hex = format_hex(rgb);
        if let Some(&position) = self.by_hex.get(&hex) {
            return Ok(self.colors[position].clone());
        }
        if let Some(threshold) = similarity {
            if !(threshold > 0.0) {
                return Err(CoreError::ColorNotFound(hex));
            }
            if let Some(nearest) = self.nearest(rgb, threshold) {
                return Ok(nearest.clone());
            }
        }
        Ok(self.push(rgb))
    }

    fn nearest(&self, rgb: [u8; 3], threshold: f64) -> Option<&CustomColor> {
        let mut best: Option<(i64, &CustomColor)> = None;
        for color in &self.colors {
            let distance = squared_distance(rgb, color.rgb);
            match best {
                Some((current, _)) if current <= distance => {}
                _ => best = Some((distance, color)),
            }
        }
        best.filter(|(distance, _)| (*distance as f64) < threshold * threshold)
            .map(|(_, color)| color)
    }

    /// 灰度快捷方式，等价于 `get_color` 传入灰度值。
    pub fn gray(&mut self, level: impl Into<ColorSpec>) -> Result<CustomColor, CoreError> {
        self.get_color(level, None)
    }

    /// 返回标准色或自定义色的 RGB 值。
    pub fn color_rgb(&self, index: i32) -> Result<[u8; 3], CoreError> {
        let out_of_range = || CoreError::ColorIndexOutOfRange {
            index,
            limit: self.next_index(),
        };
        if index < 0 {
            return Err(out_of_range());
        }
        if index < CUSTOM_BASE {
            return Ok(STANDARD_COLORS[index as usize]);
        }
        self.get(index).map(|color| color.rgb).ok_or_else(out_of_range)
    }

    /// 修改已注册颜色的 RGB 值，同时更新哈希索引。
    pub fn set_rgb(&mut self, index: i32, rgb: [u8; 3]) -> Result<(), CoreError> {
        let limit = self.next_index();
        let position = usize::try_from(index - CUSTOM_BASE)
            .ok()
            .filter(|position| *position < self.colors.len())
            .ok_or(CoreError::ColorIndexOutOfRange { index, limit })?;
        let old_hex = self.colors[position].hex();
        if self.by_hex.get(&old_hex) == Some(&position) {
            self.by_hex.remove(&old_hex);
            if let Some(other) = self
                .colors
                .iter()
                .enumerate()
                .find(|(other, color)| *other != position && color.hex() == old_hex)
                .map(|(other, _)| other)
            {
                self.by_hex.insert(old_hex, other);
            }
        }
        self.colors[position].rgb = rgb;
        self.by_hex.entry(format_hex(rgb)).or_insert(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_must_be_seven_characters() {
        assert_eq!(parse_hex("#ff8000").unwrap(), [255, 128, 0]);
        assert_eq!(parse_hex("#FF8000").unwrap(), [255, 128, 0]);
        assert!(parse_hex("ff8000").is_err());
        assert!(parse_hex("#ff800").is_err());
        assert!(parse_hex("#ff80000").is_err());
        assert!(parse_hex("#gg8000").is_err());
    }

    #[test]
    fn add_color_assigns_contiguous_indices() {
        let mut registry = ColorRegistry::new();
        let a = registry.add_color("#102030").unwrap();
        let b = registry.add_color("#A0B0C0").unwrap();
        assert_eq!(a.index, 32);
        assert_eq!(b.index, 33);
        assert_eq!(b.hex(), "#a0b0c0");
        assert_eq!(registry.next_index(), 34);
        assert!(matches!(
            registry.add_color("red"),
            Err(CoreError::InvalidColor(_))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_color_dedups_across_input_forms() {
        let mut registry = ColorRegistry::new();
        let first = registry.get_color((255, 0, 0), None).unwrap();
        let again = registry.get_color((1.0, 0.0, 0.0), None).unwrap();
        let hex = registry.get_color("#ff0000", None).unwrap();
        assert_eq!(first.index, 32);
        assert_eq!(again.index, 32);
        assert_eq!(hex.index, 32);
        assert_eq!(registry.len(), 1);

        let gray = registry.gray(0.5).unwrap();
        let gray_int = registry.get_color(128, None).unwrap();
        assert_eq!(gray.index, gray_int.index);
        assert_eq!(gray.rgb, [128, 128, 128]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn similarity_merges_near_colors() {
        let mut registry = ColorRegistry::new();
        let base = registry.add_color("#100000").unwrap();
        let near = registry.get_color((0x11, 0, 0), Some(5.0)).unwrap();
        assert_eq!(near.index, base.index);
        assert_eq!(registry.len(), 1);

        let far = registry.get_color((0x50, 0, 0), Some(5.0)).unwrap();
        assert_eq!(far.index, 33);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn similarity_tie_prefers_registration_order() {
        let mut registry = ColorRegistry::new();
        registry.add_color("#0a0000").unwrap();
        registry.add_color("#000a00").unwrap();
        let picked = registry.get_color((5, 5, 0), Some(20.0)).unwrap();
        assert_eq!(picked.index, 32);
    }

    #[test]
    fn strict_similarity_refuses_to_allocate() {
        let mut registry = ColorRegistry::new();
        registry.add_color("#000000").unwrap();
        assert!(matches!(
            registry.get_color((1, 2, 3), Some(0.0)),
            Err(CoreError::ColorNotFound(_))
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get_color((0, 0, 0), Some(0.0)).unwrap().index,
            32
        );
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        let mut registry = ColorRegistry::new();
        assert!(registry.get_color((256, 0, 0), None).is_err());
        assert!(registry.get_color((1.5, 0.0, 0.0), None).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn color_rgb_covers_standard_and_custom_range() {
        let mut registry = ColorRegistry::new();
        registry.add_color("#123456").unwrap();
        assert_eq!(registry.color_rgb(RED).unwrap(), [255, 0, 0]);
        assert_eq!(registry.color_rgb(GOLD).unwrap(), [255, 215, 0]);
        assert_eq!(registry.color_rgb(32).unwrap(), [0x12, 0x34, 0x56]);
        assert_eq!(
            registry.color_rgb(33),
            Err(CoreError::ColorIndexOutOfRange {
                index: 33,
                limit: 33
            })
        );
        assert!(registry.color_rgb(DEFAULT).is_err());
    }

    #[test]
    fn set_rgb_rekeys_lookup() {
        let mut registry = ColorRegistry::new();
        registry.add_color("#000001").unwrap();
        registry.set_rgb(32, [0, 0, 2]).unwrap();
        assert_eq!(registry.get_color("#000002", Some(0.0)).unwrap().index, 32);
        assert!(registry.get_color("#000001", Some(0.0)).is_err());
        assert!(registry.set_rgb(40, [0, 0, 0]).is_err());
    }

    #[test]
    fn registry_serializes_as_ordered_list() {
        let mut registry = ColorRegistry::new();
        registry.add_color("#010203").unwrap();
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json, serde_json::json!([{ "index": 32, "rgb": [1, 2, 3] }]));
        let mut restored: ColorRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(restored.get_color("#010203", Some(0.0)).unwrap().index, 32);
    }
}
