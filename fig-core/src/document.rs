use std::path::{Path, PathBuf};

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use crate::color::{self, ColorRegistry};
use crate::constants::{codes, fill_style, font, font_flags, line_style};
use crate::container::Container;
use crate::geometry::{Point, Rect};

/// 箭头参数：`type style thickness width height`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub kind: i32,
    pub style: i32,
    pub thickness: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Arrow {
    fn default() -> Self {
        Self {
            kind: 0,
            style: 0,
            thickness: 1.0,
            width: 60.0,
            height: 120.0,
        }
    }
}

/// 所有可绘制对象共享的样式属性。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub line_style: i32,
    /// 线宽，单位 1/80 英寸。
    pub line_width: i32,
    pub pen_color: i32,
    pub fill_color: i32,
    /// 图层深度 0..=999。
    pub depth: i32,
    /// 文件格式保留字段，原样往返。
    pub pen_style: i32,
    pub fill_style: i32,
    /// 虚线长度 / 点间距，单位 1/80 英寸。
    pub style_value: f64,
    pub join_style: i32,
    pub cap_style: i32,
    pub forward_arrow: Option<Arrow>,
    pub backward_arrow: Option<Arrow>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            line_style: line_style::DEFAULT,
            line_width: 1,
            pen_color: color::DEFAULT,
            fill_color: color::DEFAULT,
            depth: 50,
            pen_style: 0,
            fill_style: fill_style::NONE,
            style_value: 3.0,
            join_style: 0,
            cap_style: 0,
            forward_arrow: None,
            backward_arrow: None,
        }
    }
}

impl Style {
    /// 箭头行数（0..=2），决定续行数量的一部分。
    #[inline]
    pub fn arrow_count(&self) -> usize {
        usize::from(self.forward_arrow.is_some()) + usize::from(self.backward_arrow.is_some())
    }
}

fn points_bounds<'a>(points: impl IntoIterator<Item = &'a Point>) -> Rect {
    let mut bounds = Rect::empty();
    for point in points {
        bounds.include_point(*point);
    }
    bounds
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolylineKind {
    Open,
    Box,
    Polygon,
    RoundedBox,
    Picture,
}

impl PolylineKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Open),
            2 => Some(Self::Box),
            3 => Some(Self::Polygon),
            4 => Some(Self::RoundedBox),
            5 => Some(Self::Picture),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Open => 1,
            Self::Box => 2,
            Self::Polygon => 3,
            Self::RoundedBox => 4,
            Self::Picture => 5,
        }
    }

    /// 闭合类型在文件中会重复首点作为末点，内存中不保存该重复点。
    #[inline]
    pub fn is_closed(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// 图片框引用的外部文件。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    pub flipped: bool,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub kind: PolylineKind,
    pub style: Style,
    pub points: Vec<Point>,
    /// 圆角框的圆角半径，其余类型通常为 -1。
    pub corner_radius: i32,
    /// 仅 `PolylineKind::Picture` 使用。
    pub picture: Option<Picture>,
}

impl Polyline {
    pub fn new(kind: PolylineKind, points: Vec<Point>) -> Self {
        Self {
            kind,
            style: Style::default(),
            points,
            corner_radius: -1,
            picture: None,
        }
    }

    pub fn open(points: Vec<Point>) -> Self {
        Self::new(PolylineKind::Open, points)
    }

    pub fn polygon(points: Vec<Point>) -> Self {
        Self::new(PolylineKind::Polygon, points)
    }

    pub fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(PolylineKind::Box, box_points(x1, y1, x2, y2))
    }

    pub fn rounded_box(x1: i32, y1: i32, x2: i32, y2: i32, radius: i32) -> Self {
        let mut polyline = Self::new(PolylineKind::RoundedBox, box_points(x1, y1, x2, y2));
        polyline.corner_radius = radius;
        polyline
    }

    pub fn picture(
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        filename: impl Into<String>,
        flipped: bool,
    ) -> Self {
        let mut polyline = Self::new(PolylineKind::Picture, box_points(x1, y1, x2, y2));
        polyline.picture = Some(Picture {
            flipped,
            filename: filename.into(),
        });
        polyline
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.kind.is_closed()
    }

    /// 文件中写出的点序列（闭合类型追加首点）。
    pub fn wire_points(&self) -> impl Iterator<Item = Point> + '_ {
        let closing = if self.is_closed() {
            self.points.first().copied()
        } else {
            None
        };
        self.points.iter().copied().chain(closing)
    }

    pub fn bounds(&self) -> Rect {
        points_bounds(&self.points)
    }

    /// 矩形类对象（首点与第三点为对角）的中心。
    pub fn box_center(&self) -> Option<Point> {
        let (a, c) = (self.points.first()?, self.points.get(2)?);
        Some(Point::new(
            (a.x() + c.x()).div_euclid(2),
            (a.y() + c.y()).div_euclid(2),
        ))
    }

    pub fn box_width(&self) -> Option<i32> {
        let (a, c) = (self.points.first()?, self.points.get(2)?);
        Some((c.x() - a.x()).abs())
    }

    pub fn box_height(&self) -> Option<i32> {
        let (a, c) = (self.points.first()?, self.points.get(2)?);
        Some((c.y() - a.y()).abs())
    }
}

fn box_points(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<Point> {
    vec![
        Point::new(x1, y1),
        Point::new(x2, y1),
        Point::new(x2, y2),
        Point::new(x1, y2),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplineKind {
    Approximated,
    Interpolated,
    XSpline,
}

impl SplineKind {
    /// 子类型编号同时编码了种类与是否闭合。
    pub fn from_code(code: i32) -> Option<(Self, bool)> {
        match code {
            0 => Some((Self::Approximated, false)),
            1 => Some((Self::Approximated, true)),
            2 => Some((Self::Interpolated, false)),
            3 => Some((Self::Interpolated, true)),
            4 => Some((Self::XSpline, false)),
            5 => Some((Self::XSpline, true)),
            _ => None,
        }
    }

    pub fn code(self, closed: bool) -> i32 {
        let base = match self {
            Self::Approximated => 0,
            Self::Interpolated => 2,
            Self::XSpline => 4,
        };
        base + i32::from(closed)
    }

    /// 未显式给出形状因子时使用的默认值。
    pub fn default_shape_factor(self) -> f64 {
        match self {
            Self::Approximated => 1.0,
            Self::Interpolated => -1.0,
            Self::XSpline => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub kind: SplineKind,
    pub closed: bool,
    pub style: Style,
    pub points: Vec<Point>,
    /// 每个控制点一个形状因子。
    pub shape_factors: Vec<f64>,
}

impl Spline {
    pub fn new(kind: SplineKind, closed: bool, points: Vec<Point>) -> Self {
        let shape_factors = vec![kind.default_shape_factor(); points.len()];
        Self {
            kind,
            closed,
            style: Style::default(),
            points,
            shape_factors,
        }
    }

    pub fn with_shape_factors(mut self, shape_factors: Vec<f64>) -> Self {
        self.shape_factors = shape_factors;
        self
    }

    /// 第 `index` 个点的形状因子，缺失时使用种类默认值。
    pub fn shape_factor(&self, index: usize) -> f64 {
        self.shape_factors
            .get(index)
            .copied()
            .unwrap_or_else(|| self.kind.default_shape_factor())
    }

    /// 仅为控制点的包围盒，曲线本身可能超出。
    pub fn bounds(&self) -> Rect {
        points_bounds(&self.points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcKind {
    Open,
    Pie,
}

impl ArcKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Open),
            0 | 2 => Some(Self::Pie),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Open => 1,
            Self::Pie => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

impl ArcDirection {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Clockwise),
            1 => Some(Self::CounterClockwise),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Clockwise => 0,
            Self::CounterClockwise => 1,
        }
    }
}

/// 由三点确定的圆弧，圆心为浮点值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub kind: ArcKind,
    pub direction: ArcDirection,
    pub style: Style,
    pub center: DVec2,
    pub points: [Point; 3],
}

impl Arc {
    pub fn new(kind: ArcKind, direction: ArcDirection, center: DVec2, points: [Point; 3]) -> Self {
        Self {
            kind,
            direction,
            style: Style::default(),
            center,
            points,
        }
    }

    pub fn bounds(&self) -> Rect {
        points_bounds(&self.points)
    }
}

/// 椭圆子类型，同时记录对象最初是以半径还是以对角点方式给出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EllipseShape {
    EllipseRadii,
    EllipseDiameter,
    CircleRadius,
    CircleDiameter,
}

impl EllipseShape {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::EllipseRadii),
            2 => Some(Self::EllipseDiameter),
            3 => Some(Self::CircleRadius),
            4 => Some(Self::CircleDiameter),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::EllipseRadii => 1,
            Self::EllipseDiameter => 2,
            Self::CircleRadius => 3,
            Self::CircleDiameter => 4,
        }
    }

    #[inline]
    pub fn is_circle(self) -> bool {
        matches!(self, Self::CircleRadius | Self::CircleDiameter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub shape: EllipseShape,
    pub style: Style,
    /// 主轴角度（弧度）。
    pub angle: f64,
    pub center: Point,
    pub radius: IVec2,
    pub start: Point,
    pub end: Point,
}

impl Ellipse {
    fn blank(shape: EllipseShape) -> Self {
        Self {
            shape,
            style: Style::default(),
            angle: 0.0,
            center: Point::default(),
            radius: IVec2::ZERO,
            start: Point::default(),
            end: Point::default(),
        }
    }

    pub fn with_radii(center: Point, radii: IVec2) -> Self {
        let mut ellipse = Self::blank(EllipseShape::EllipseRadii);
        ellipse.center = center;
        ellipse.set_radius(radii);
        ellipse
    }

    pub fn circle(center: Point, radius: i32) -> Self {
        let mut ellipse = Self::blank(EllipseShape::CircleRadius);
        ellipse.center = center;
        ellipse.set_radius(IVec2::splat(radius));
        ellipse
    }

    /// 以对角点构造椭圆，中心取两点中点。
    pub fn from_corners(start: Point, end: Point) -> Self {
        let mut ellipse = Self::blank(EllipseShape::EllipseDiameter);
        ellipse.start = start;
        ellipse.end = end;
        ellipse.center = midpoint(start, end);
        ellipse.radius = end.as_ivec2() - ellipse.center.as_ivec2();
        ellipse
    }

    /// 以直径两端点构造圆，半径四舍五入为整数。
    pub fn circle_from_corners(start: Point, end: Point) -> Self {
        let mut ellipse = Self::blank(EllipseShape::CircleDiameter);
        ellipse.start = start;
        ellipse.end = end;
        ellipse.center = midpoint(start, end);
        let delta = (end.as_ivec2() - ellipse.center.as_ivec2()).as_dvec2();
        ellipse.radius = IVec2::splat(delta.length().round() as i32);
        ellipse
    }

    /// 更新半径并同步起止参考点，对象随之变为半径形式。
    pub fn set_radius(&mut self, radius: IVec2) {
        self.radius = radius;
        self.start = self.center;
        self.end = clamped_point(
            i64::from(self.center.x()) + i64::from(radius.x),
            i64::from(self.center.y()) + i64::from(radius.y),
        );
        self.shape = if self.shape.is_circle() {
            EllipseShape::CircleRadius
        } else {
            EllipseShape::EllipseRadii
        };
    }

    pub fn bounds(&self) -> Rect {
        let (x, y) = (i64::from(self.center.x()), i64::from(self.center.y()));
        let (rx, ry) = (i64::from(self.radius.x), i64::from(self.radius.y));
        let mut bounds = Rect::empty();
        bounds.include_point(clamped_point(x - rx, y - ry));
        bounds.include_point(clamped_point(x + rx, y + ry));
        bounds
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    clamped_point(
        (i64::from(a.x()) + i64::from(b.x())).div_euclid(2),
        (i64::from(a.y()) + i64::from(b.y())).div_euclid(2),
    )
}

/// 包围盒计算在 i64 中进行，结果收敛到 i32 坐标范围内。
fn clamped_point(x: i64, y: i64) -> Point {
    Point::new(clamp_coord(x), clamp_coord(y))
}

fn clamp_coord(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Center),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

/// 文本对象。`height`/`length` 为排版占位值，不会根据字符串重新计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub style: Style,
    pub alignment: Alignment,
    pub position: Point,
    pub text: String,
    pub font: i32,
    pub font_size: f64,
    pub angle: f64,
    pub font_flags: i32,
    pub height: f64,
    pub length: f64,
}

impl Text {
    pub fn new(position: Point, text: impl Into<String>, alignment: Alignment) -> Self {
        Self {
            style: Style::default(),
            alignment,
            position,
            text: text.into(),
            font: font::DEFAULT,
            font_size: 12.0,
            angle: 0.0,
            font_flags: font_flags::POSTSCRIPT,
            height: 136.0,
            length: 100.0,
        }
    }

    pub fn bounds(&self) -> Rect {
        let (x, y) = (i64::from(self.position.x()), i64::from(self.position.y()));
        // 浮点转 i64 为饱和转换，NaN 记为 0
        let height = i64::from(clamp_coord(self.height.round() as i64));
        let length = i64::from(clamp_coord(self.length.round() as i64));
        let (left, right) = match self.alignment {
            Alignment::Left => (x, x + length),
            Alignment::Center => (x - length / 2, x + length / 2),
            Alignment::Right => (x - length, x),
        };
        let mut bounds = Rect::empty();
        bounds.include_point(clamped_point(left, y - height));
        bounds.include_point(clamped_point(right, y));
        bounds
    }
}

/// 组合对象。缓存的包围盒始终等于所有直接子对象包围盒的并集。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    children: Vec<Object>,
    bounds: Rect,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: impl Into<Object>) {
        let object = object.into();
        self.bounds.include_rect(&object.bounds());
        self.children.push(object);
    }

    #[inline]
    pub fn children(&self) -> &[Object] {
        &self.children
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn into_children(self) -> Vec<Object> {
        self.children
    }

    fn recompute_bounds(&mut self) {
        let mut bounds = Rect::empty();
        for child in &self.children {
            bounds.include_rect(&child.bounds());
        }
        self.bounds = bounds;
    }
}

impl Container for Compound {
    fn objects(&self) -> &[Object] {
        &self.children
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.children.get_mut(index)
    }

    fn take_child(&mut self, index: usize) -> Option<Object> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    fn children_changed(&mut self) {
        self.recompute_bounds();
    }
}

impl FromIterator<Object> for Compound {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        let mut compound = Compound::new();
        for object in iter {
            compound.push(object);
        }
        compound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Polyline,
    Spline,
    Arc,
    Ellipse,
    Text,
    Compound,
}

/// 可按名称查询/批量赋值的属性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrName {
    LineStyle,
    LineWidth,
    PenColor,
    FillColor,
    Depth,
    PenStyle,
    FillStyle,
    StyleValue,
    JoinStyle,
    CapStyle,
    CornerRadius,
    Direction,
    Angle,
    Font,
    FontSize,
    FontFlags,
    Alignment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i32),
    Float(f64),
}

impl AttrValue {
    pub fn as_f64(self) -> f64 {
        match self {
            AttrValue::Int(value) => f64::from(value),
            AttrValue::Float(value) => value,
        }
    }

    /// 浮点值仅在为整数时可转换。
    pub fn as_i32(self) -> Option<i32> {
        match self {
            AttrValue::Int(value) => Some(value),
            AttrValue::Float(value) if value.fract() == 0.0 => Some(value as i32),
            AttrValue::Float(_) => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    Polyline(Polyline),
    Spline(Spline),
    Arc(Arc),
    Ellipse(Ellipse),
    Text(Text),
    Compound(Compound),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Polyline(_) => ObjectKind::Polyline,
            Object::Spline(_) => ObjectKind::Spline,
            Object::Arc(_) => ObjectKind::Arc,
            Object::Ellipse(_) => ObjectKind::Ellipse,
            Object::Text(_) => ObjectKind::Text,
            Object::Compound(_) => ObjectKind::Compound,
        }
    }

    /// 组合对象没有样式。
    pub fn style(&self) -> Option<&Style> {
        match self {
            Object::Polyline(o) => Some(&o.style),
            Object::Spline(o) => Some(&o.style),
            Object::Arc(o) => Some(&o.style),
            Object::Ellipse(o) => Some(&o.style),
            Object::Text(o) => Some(&o.style),
            Object::Compound(_) => None,
        }
    }

    pub fn style_mut(&mut self) -> Option<&mut Style> {
        match self {
            Object::Polyline(o) => Some(&mut o.style),
            Object::Spline(o) => Some(&mut o.style),
            Object::Arc(o) => Some(&mut o.style),
            Object::Ellipse(o) => Some(&mut o.style),
            Object::Text(o) => Some(&mut o.style),
            Object::Compound(_) => None,
        }
    }

    #[inline]
    pub fn depth(&self) -> Option<i32> {
        self.style().map(|style| style.depth)
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Object::Polyline(o) => o.bounds(),
            Object::Spline(o) => o.bounds(),
            Object::Arc(o) => o.bounds(),
            Object::Ellipse(o) => o.bounds(),
            Object::Text(o) => o.bounds(),
            Object::Compound(o) => o.bounds(),
        }
    }

    /// 折线与样条的有序点序列，供路径导出等外部工具使用。
    pub fn path_points(&self) -> Option<&[Point]> {
        match self {
            Object::Polyline(o) => Some(&o.points),
            Object::Spline(o) => Some(&o.points),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> Option<bool> {
        match self {
            Object::Polyline(o) => Some(o.is_closed()),
            Object::Spline(o) => Some(o.closed),
            Object::Arc(o) => Some(o.kind == ArcKind::Pie),
            Object::Ellipse(_) => Some(true),
            _ => None,
        }
    }

    /// 读取属性；对象不具备该属性时返回 `None`。
    pub fn get(&self, name: AttrName) -> Option<AttrValue> {
        if let Some(value) = self.style().and_then(|style| style_attr(style, name)) {
            return Some(value);
        }
        match (self, name) {
            (Object::Polyline(o), AttrName::CornerRadius) => Some(o.corner_radius.into()),
            (Object::Arc(o), AttrName::Direction) => Some(o.direction.code().into()),
            (Object::Ellipse(o), AttrName::Angle) => Some(o.angle.into()),
            (Object::Text(o), AttrName::Angle) => Some(o.angle.into()),
            (Object::Text(o), AttrName::Font) => Some(o.font.into()),
            (Object::Text(o), AttrName::FontSize) => Some(o.font_size.into()),
            (Object::Text(o), AttrName::FontFlags) => Some(o.font_flags.into()),
            (Object::Text(o), AttrName::Alignment) => Some(o.alignment.code().into()),
            _ => None,
        }
    }

    /// 设置属性，返回对象是否具备该属性且值可被接受。
    pub fn set(&mut self, name: AttrName, value: AttrValue) -> bool {
        if let Some(style) = self.style_mut() {
            if let Some(applied) = set_style_attr(style, name, value) {
                return applied;
            }
        }
        match (self, name) {
            (Object::Polyline(o), AttrName::CornerRadius) => assign_int(&mut o.corner_radius, value),
            (Object::Arc(o), AttrName::Direction) => {
                match value.as_i32().and_then(ArcDirection::from_code) {
                    Some(direction) => {
                        o.direction = direction;
                        true
                    }
                    None => false,
                }
            }
            (Object::Ellipse(o), AttrName::Angle) => {
                o.angle = value.as_f64();
                true
            }
            (Object::Text(o), AttrName::Angle) => {
                o.angle = value.as_f64();
                true
            }
            (Object::Text(o), AttrName::Font) => assign_int(&mut o.font, value),
            (Object::Text(o), AttrName::FontSize) => {
                o.font_size = value.as_f64();
                true
            }
            (Object::Text(o), AttrName::FontFlags) => assign_int(&mut o.font_flags, value),
            (Object::Text(o), AttrName::Alignment) => {
                match value.as_i32().and_then(Alignment::from_code) {
                    Some(alignment) => {
                        o.alignment = alignment;
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

fn style_attr(style: &Style, name: AttrName) -> Option<AttrValue> {
    let value = match name {
        AttrName::LineStyle => style.line_style.into(),
        AttrName::LineWidth => style.line_width.into(),
        AttrName::PenColor => style.pen_color.into(),
        AttrName::FillColor => style.fill_color.into(),
        AttrName::Depth => style.depth.into(),
        AttrName::PenStyle => style.pen_style.into(),
        AttrName::FillStyle => style.fill_style.into(),
        AttrName::StyleValue => style.style_value.into(),
        AttrName::JoinStyle => style.join_style.into(),
        AttrName::CapStyle => style.cap_style.into(),
        _ => return None,
    };
    Some(value)
}

/// 非样式属性返回 `None`，交由具体对象处理。
fn set_style_attr(style: &mut Style, name: AttrName, value: AttrValue) -> Option<bool> {
    let slot = match name {
        AttrName::LineStyle => &mut style.line_style,
        AttrName::LineWidth => &mut style.line_width,
        AttrName::PenColor => &mut style.pen_color,
        AttrName::FillColor => &mut style.fill_color,
        AttrName::Depth => &mut style.depth,
        AttrName::PenStyle => &mut style.pen_style,
        AttrName::FillStyle => &mut style.fill_style,
        AttrName::JoinStyle => &mut style.join_style,
        AttrName::CapStyle => &mut style.cap_style,
        AttrName::StyleValue => {
            style.style_value = value.as_f64();
            return Some(true);
        }
        _ => return None,
    };
    Some(assign_int(slot, value))
}

fn assign_int(slot: &mut i32, value: AttrValue) -> bool {
    match value.as_i32() {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

macro_rules! impl_into_object {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Object {
                fn from(value: $variant) -> Self {
                    Object::$variant(value)
                }
            }
        )*
    };
}

impl_into_object!(Polyline, Spline, Arc, Ellipse, Text, Compound);

/// 文件头中的全局页面设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    pub landscape: bool,
    pub centered: bool,
    pub metric: bool,
    pub paper_size: String,
    pub magnification: f64,
    pub single_page: bool,
    /// -2 表示不透明，-1 表示背景色，其余为颜色编号。
    pub transparent_color: i32,
    /// 每英寸的文档单位数。
    pub resolution: i32,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            landscape: false,
            centered: true,
            metric: true,
            paper_size: "A4".to_string(),
            magnification: 100.0,
            single_page: true,
            transparent_color: -2,
            resolution: 1200,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page: PageSettings,
    objects: Vec<Object>,
    colors: ColorRegistry,
    #[serde(skip)]
    filename: Option<PathBuf>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, object: impl Into<Object>) {
        self.objects.push(object.into());
    }

    #[inline]
    pub fn colors(&self) -> &ColorRegistry {
        &self.colors
    }

    #[inline]
    pub fn colors_mut(&mut self) -> &mut ColorRegistry {
        &mut self.colors
    }

    #[inline]
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, path: impl Into<PathBuf>) {
        self.filename = Some(path.into());
    }

    pub fn bounds(&self) -> Rect {
        let mut bounds = Rect::empty();
        for object in &self.objects {
            bounds.include_rect(&object.bounds());
        }
        bounds
    }
}

impl Container for Document {
    fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.objects.get_mut(index)
    }

    fn take_child(&mut self, index: usize) -> Option<Object> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }
}

/// 主记录行对象代码，供读写两端共享。
pub fn object_code(object: &Object) -> i32 {
    match object {
        Object::Polyline(_) => codes::POLYLINE,
        Object::Spline(_) => codes::SPLINE,
        Object::Arc(_) => codes::ARC,
        Object::Ellipse(_) => codes::ELLIPSE,
        Object::Text(_) => codes::TEXT,
        Object::Compound(_) => codes::COMPOUND_BEGIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_polyline_repeats_first_point_on_wire_only() {
        let rect = Polyline::rect(0, 0, 100, 50);
        assert_eq!(rect.points.len(), 4);
        let wire: Vec<Point> = rect.wire_points().collect();
        assert_eq!(wire.len(), 5);
        assert_eq!(wire[4], wire[0]);

        let open = Polyline::open(vec![Point::new(0, 0), Point::new(10, 10)]);
        assert_eq!(open.wire_points().count(), 2);
        assert_eq!(Polyline::polygon(Vec::new()).wire_points().count(), 0);
    }

    #[test]
    fn box_helpers_use_diagonal_corners() {
        let rect = Polyline::rect(10, 20, 110, 70);
        assert_eq!(rect.box_center(), Some(Point::new(60, 45)));
        assert_eq!(rect.box_width(), Some(100));
        assert_eq!(rect.box_height(), Some(50));
        assert_eq!(Polyline::open(vec![Point::new(0, 0)]).box_width(), None);
    }

    #[test]
    fn spline_codes_encode_closedness() {
        for code in 0..6 {
            let (kind, closed) = SplineKind::from_code(code).unwrap();
            assert_eq!(kind.code(closed), code);
        }
        assert!(SplineKind::from_code(6).is_none());
        let spline = Spline::new(SplineKind::Interpolated, false, vec![Point::new(0, 0); 3]);
        assert_eq!(spline.shape_factors, vec![-1.0; 3]);
        assert_eq!(spline.shape_factor(7), -1.0);
    }

    #[test]
    fn ellipse_constructors_track_reference_points() {
        let ellipse = Ellipse::with_radii(Point::new(100, 100), IVec2::new(30, 20));
        assert_eq!(ellipse.shape, EllipseShape::EllipseRadii);
        assert_eq!(ellipse.start, Point::new(100, 100));
        assert_eq!(ellipse.end, Point::new(130, 120));
        assert_eq!(ellipse.bounds(), Rect::new(70, 80, 130, 120));

        let circle = Ellipse::circle_from_corners(Point::new(0, 0), Point::new(60, 80));
        assert_eq!(circle.shape, EllipseShape::CircleDiameter);
        assert_eq!(circle.center, Point::new(30, 40));
        assert_eq!(circle.radius, IVec2::splat(50));

        let mut diameter = Ellipse::from_corners(Point::new(0, 0), Point::new(40, 20));
        assert_eq!(diameter.radius, IVec2::new(20, 10));
        diameter.set_radius(IVec2::new(5, 5));
        assert_eq!(diameter.shape, EllipseShape::EllipseRadii);
        assert_eq!(diameter.start, diameter.center);
    }

    #[test]
    fn text_bounds_follow_alignment() {
        let mut text = Text::new(Point::new(1000, 500), "label", Alignment::Left);
        text.height = 100.0;
        text.length = 400.0;
        assert_eq!(text.bounds(), Rect::new(1000, 400, 1400, 500));
        text.alignment = Alignment::Center;
        assert_eq!(text.bounds(), Rect::new(800, 400, 1200, 500));
        text.alignment = Alignment::Right;
        assert_eq!(text.bounds(), Rect::new(600, 400, 1000, 500));
    }

    #[test]
    fn oversized_extents_clamp_to_coordinate_range() {
        let mut text = Text::new(Point::new(100, 200), "hi", Alignment::Left);
        text.length = 1.0e10;
        assert_eq!(text.bounds(), Rect::new(100, 64, i32::MAX, 200));
        text.alignment = Alignment::Right;
        text.height = -1.0e12;
        assert_eq!(text.bounds(), Rect::new(100 - i32::MAX, 200, 100, i32::MAX));

        let mut compound = Compound::new();
        compound.push(text);
        compound.push(Ellipse::with_radii(
            Point::new(i32::MAX - 1, 0),
            IVec2::new(10, i32::MAX),
        ));
        assert_eq!(
            compound.bounds(),
            Rect::new(100 - i32::MAX, -i32::MAX, i32::MAX, i32::MAX)
        );
        let wide = Ellipse::from_corners(Point::new(i32::MAX, 0), Point::new(i32::MAX, 0));
        assert_eq!(wide.center, Point::new(i32::MAX, 0));
    }

    #[test]
    fn compound_bounds_track_appends() {
        let mut compound = Compound::new();
        assert!(compound.bounds().is_empty());
        compound.push(Polyline::rect(0, 0, 10, 10));
        assert_eq!(compound.bounds(), Rect::new(0, 0, 10, 10));
        compound.push(Ellipse::circle(Point::new(50, 50), 5));
        assert_eq!(compound.bounds(), Rect::new(0, 0, 55, 55));

        let mut outer = Compound::new();
        outer.push(Polyline::open(vec![Point::new(-20, 5)]));
        outer.push(compound);
        assert_eq!(outer.bounds(), Rect::new(-20, 0, 55, 55));
    }

    #[test]
    fn attributes_are_variant_aware() {
        let mut text = Object::from(Text::new(Point::new(0, 0), "x", Alignment::Left));
        assert_eq!(text.get(AttrName::Depth), Some(AttrValue::Int(50)));
        assert_eq!(text.get(AttrName::FontSize), Some(AttrValue::Float(12.0)));
        assert_eq!(text.get(AttrName::CornerRadius), None);
        assert!(text.set(AttrName::Alignment, 2.into()));
        assert_eq!(text.get(AttrName::Alignment), Some(AttrValue::Int(2)));
        assert!(!text.set(AttrName::Alignment, 9.into()));
        assert!(!text.set(AttrName::LineWidth, 1.5.into()));
        assert!(text.set(AttrName::LineWidth, 3.0.into()));
        assert_eq!(text.get(AttrName::LineWidth), Some(AttrValue::Int(3)));

        let mut compound = Object::from(Compound::new());
        assert_eq!(compound.get(AttrName::Depth), None);
        assert!(!compound.set(AttrName::Depth, 10.into()));
    }

    #[test]
    fn attr_values_compare_numerically() {
        assert_eq!(AttrValue::Int(3), AttrValue::Float(3.0));
        assert_ne!(AttrValue::Int(3), AttrValue::Float(3.5));
    }

    #[test]
    fn new_document_uses_format_defaults() {
        let doc = Document::new();
        assert!(!doc.page.landscape);
        assert!(doc.page.centered);
        assert!(doc.page.metric);
        assert_eq!(doc.page.paper_size, "A4");
        assert_eq!(doc.page.resolution, 1200);
        assert_eq!(doc.page.transparent_color, -2);
        assert!(doc.objects().is_empty());
        assert!(doc.colors().is_empty());
        assert!(doc.filename().is_none());
    }

    #[test]
    fn document_survives_json_round_trip() {
        let mut doc = Document::new();
        doc.colors_mut().add_color("#336699").unwrap();
        let mut group = Compound::new();
        group.push(Polyline::picture(0, 0, 50, 50, "logo.png", true));
        group.push(Spline::new(SplineKind::XSpline, true, vec![Point::new(1, 2); 4]));
        doc.append(group);
        doc.append(Arc::new(
            ArcKind::Pie,
            ArcDirection::CounterClockwise,
            DVec2::new(10.5, 20.0),
            [Point::new(0, 0), Point::new(10, 10), Point::new(20, 0)],
        ));

        let json = serde_json::to_string(&doc).unwrap();
        let restored: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, doc);
    }
}
