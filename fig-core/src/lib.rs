pub mod color;
pub mod constants;
pub mod container;
pub mod document;

pub mod errors {
    use thiserror::Error;

    use crate::container::ObjectPath;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum CoreError {
        #[error("invalid color specification: {0}")]
        InvalidColor(String),
        #[error("no custom color matches {0}")]
        ColorNotFound(String),
        #[error("color index {index} outside palette range 0..{limit}")]
        ColorIndexOutOfRange { index: i32, limit: i32 },
        #[error("object not found at {0}")]
        ObjectNotFound(ObjectPath),
        #[error("invalid geometry string: {0}")]
        InvalidGeometry(String),
    }
}

pub mod geometry {
    use std::fmt;
    use std::str::FromStr;

    use glam::IVec2;
    use serde::{Deserialize, Serialize};

    use crate::errors::CoreError;

    /// 文档坐标点，单位为 1/resolution 英寸，内部以 `glam::IVec2` 表示。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Point(pub IVec2);

    impl Point {
        #[inline]
        pub fn new(x: i32, y: i32) -> Self {
            Self(IVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> i32 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> i32 {
            self.0.y
        }

        #[inline]
        pub fn as_ivec2(self) -> IVec2 {
            self.0
        }
    }

    impl From<IVec2> for Point {
        fn from(value: IVec2) -> Self {
            Self(value)
        }
    }

    impl From<(i32, i32)> for Point {
        fn from((x, y): (i32, i32)) -> Self {
            Self::new(x, y)
        }
    }

    /// 轴对齐边界框。
    ///
    /// 空框吸收第一个点后宽高为零；之后每次合并只会扩大范围，
    /// `x1/y1` 始终是最小值，`x2/y2` 始终是最大值。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Rect {
        pub x1: i32,
        pub y1: i32,
        pub x2: i32,
        pub y2: i32,
        empty: bool,
    }

    impl Default for Rect {
        fn default() -> Self {
            Self::empty()
        }
    }

    impl Rect {
        #[inline]
        pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
            Self {
                x1,
                y1,
                x2,
                y2,
                empty: false,
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                x1: 0,
                y1: 0,
                x2: 0,
                y2: 0,
                empty: true,
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.empty
        }

        pub fn include_point(&mut self, point: Point) {
            if self.empty {
                self.x1 = point.x();
                self.x2 = point.x();
                self.y1 = point.y();
                self.y2 = point.y();
                self.empty = false;
                return;
            }
            self.x1 = self.x1.min(point.x());
            self.y1 = self.y1.min(point.y());
            self.x2 = self.x2.max(point.x());
            self.y2 = self.y2.max(point.y());
        }

        /// 以四个角点依次合并另一个框；空框不产生影响。
        pub fn include_rect(&mut self, other: &Rect) {
            if other.empty {
                return;
            }
            for corner in [
                Point::new(other.x1, other.y1),
                Point::new(other.x2, other.y1),
                Point::new(other.x2, other.y2),
                Point::new(other.x1, other.y2),
            ] {
                self.include_point(corner);
            }
        }

        #[inline]
        pub fn width(&self) -> i32 {
            debug_assert!(!self.empty);
            self.x2 - self.x1
        }

        #[inline]
        pub fn height(&self) -> i32 {
            debug_assert!(!self.empty);
            self.y2 - self.y1
        }

        #[inline]
        pub fn size(&self) -> (i32, i32) {
            (self.width(), self.height())
        }

        #[inline]
        pub fn upper_left(&self) -> Point {
            Point::new(self.x1, self.y1)
        }

        #[inline]
        pub fn lower_right(&self) -> Point {
            Point::new(self.x2, self.y2)
        }

        #[inline]
        pub fn center(&self) -> Point {
            debug_assert!(!self.empty);
            Point::new(
                (self.x1 + self.x2).div_euclid(2),
                (self.y1 + self.y2).div_euclid(2),
            )
        }
    }

    impl fmt::Display for Rect {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{},{}-{},{}", self.x1, self.y1, self.x2, self.y2)
        }
    }

    /// 解析几何字符串，支持三种写法：
    ///
    /// - `x1,y1-x2,y2`（两个角点）
    /// - `x,y+WxH`（左上角加尺寸）
    /// - `x1,y1,x2,y2`
    ///
    /// 分隔符 `,` 与 `:` 可互换。
    impl FromStr for Rect {
        type Err = CoreError;

        fn from_str(raw: &str) -> Result<Self, Self::Err> {
            let invalid = || CoreError::InvalidGeometry(raw.to_string());
            let (numbers, separators) = split_numbers(raw).ok_or_else(invalid)?;
            if numbers.len() != 4 || separators.len() != 3 {
                return Err(invalid());
            }
            if !matches!(separators[0], ',' | ':')
                || !matches!(separators[1], '+' | '-' | ':' | ',')
                || !matches!(separators[2], 'x' | ':' | ',')
            {
                return Err(invalid());
            }
            let [x1, y1, a, b] = [numbers[0], numbers[1], numbers[2], numbers[3]];
            if separators[1] == '+' || separators[2] == 'x' {
                if separators[1] == '-' {
                    return Err(invalid());
                }
                Ok(Rect::new(x1, y1, x1 + a, y1 + b))
            } else {
                Ok(Rect::new(x1, y1, a, b))
            }
        }
    }

    /// 解析 `640x480` 形式的尺寸字符串。
    pub fn parse_size(raw: &str) -> Result<(i32, i32), CoreError> {
        let invalid = || CoreError::InvalidGeometry(raw.to_string());
        let (numbers, separators) = split_numbers(raw).ok_or_else(invalid)?;
        match (numbers.as_slice(), separators.as_slice()) {
            ([w, h], ['x']) => Ok((*w, *h)),
            _ => Err(invalid()),
        }
    }

    fn split_numbers(raw: &str) -> Option<(Vec<i32>, Vec<char>)> {
        let mut numbers = Vec::new();
        let mut separators = Vec::new();
        let mut digits = String::new();
        for ch in raw.trim().chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            if digits.is_empty() {
                return None;
            }
            numbers.push(digits.parse().ok()?);
            digits.clear();
            separators.push(ch);
        }
        if digits.is_empty() {
            return None;
        }
        numbers.push(digits.parse().ok()?);
        Some((numbers, separators))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn empty_rect_absorbs_first_point() {
            let mut rect = Rect::empty();
            assert!(rect.is_empty());
            rect.include_point(Point::new(10, 20));
            assert!(!rect.is_empty());
            assert_eq!(rect.size(), (0, 0));
            rect.include_point(Point::new(-5, 40));
            assert_eq!(rect, Rect::new(-5, 20, 10, 40));
            assert_eq!(rect.center(), Point::new(2, 30));
        }

        #[test]
        fn rect_union_only_widens() {
            let mut rect = Rect::new(0, 0, 10, 10);
            rect.include_rect(&Rect::new(2, 2, 5, 5));
            assert_eq!(rect, Rect::new(0, 0, 10, 10));
            rect.include_rect(&Rect::new(-3, 4, 12, 6));
            assert_eq!(rect, Rect::new(-3, 0, 12, 10));
            rect.include_rect(&Rect::empty());
            assert_eq!(rect, Rect::new(-3, 0, 12, 10));
        }

        #[test]
        fn geometry_strings_parse_in_all_forms() {
            assert_eq!(
                "320,240-640,480".parse::<Rect>().unwrap(),
                Rect::new(320, 240, 640, 480)
            );
            assert_eq!(
                "50,50+50x50".parse::<Rect>().unwrap(),
                Rect::new(50, 50, 100, 100)
            );
            assert_eq!(
                "40,40,320,240".parse::<Rect>().unwrap(),
                Rect::new(40, 40, 320, 240)
            );
            let rect = Rect::new(0, 0, 320, 240);
            assert_eq!(rect.to_string().parse::<Rect>().unwrap(), rect);
            assert!("10,10-20x20".parse::<Rect>().is_err());
            assert!("10,10".parse::<Rect>().is_err());
        }

        #[test]
        fn size_string_parses() {
            assert_eq!(parse_size("640x480").unwrap(), (640, 480));
            assert!(parse_size("640,480").is_err());
        }
    }
}
