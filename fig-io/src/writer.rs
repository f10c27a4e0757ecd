use fig_core::constants::codes;
use fig_core::container::Container;
use fig_core::document::{
    Arc, Arrow, Compound, Document, Ellipse, Object, PageSettings, Polyline, PolylineKind, Spline,
    Style, Text,
};
use fig_core::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const POINTS_PER_LINE: usize = 6;
const FACTORS_PER_LINE: usize = 8;

/// 写出选项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterOptions {
    /// 续行前缀。
    pub continuation_indent: String,
    /// 写在文件第一行的版本注释。
    pub header_comment: String,
    /// 是否写出不含任何图元的组合。
    pub emit_empty_compounds: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            continuation_indent: "\t".to_string(),
            header_comment: "#FIG 3.2".to_string(),
            emit_empty_compounds: false,
        }
    }
}

/// 整数值保留一位小数（`3.0`），其余使用最短表示。
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// 单行字段构造器，字段之间以一个空格分隔。
#[derive(Default)]
struct Fields(Vec<String>);

impl Fields {
    fn code(code: i32) -> Self {
        Self(vec![code.to_string()])
    }

    fn int(mut self, value: i32) -> Self {
        self.0.push(value.to_string());
        self
    }

    fn flag(self, value: bool) -> Self {
        self.int(i32::from(value))
    }

    fn float(mut self, value: f64) -> Self {
        self.0.push(format_float(value));
        self
    }

    fn rounded(mut self, value: f64) -> Self {
        self.0.push(format!("{}", value.round() as i64));
        self
    }

    fn point(self, point: Point) -> Self {
        self.int(point.x()).int(point.y())
    }

    fn raw(mut self, value: impl Into<String>) -> Self {
        self.0.push(value.into());
        self
    }

    /// 字段 2..=9：所有图元共享的样式部分。
    fn style(self, style: &Style) -> Self {
        self.int(style.line_style)
            .int(style.line_width)
            .int(style.pen_color)
            .int(style.fill_color)
            .int(style.depth)
            .int(style.pen_style)
            .int(style.fill_style)
            .float(style.style_value)
    }

    fn finish(self) -> String {
        self.0.join(" ")
    }
}

/// 不含任何图元（只含空组合）的组合。
fn is_blank(compound: &Compound) -> bool {
    compound
        .children()
        .iter()
        .all(|child| matches!(child, Object::Compound(inner) if is_blank(inner)))
}

/// 把文档序列化为 FIG 文本，输出布局与 [`crate::FigParser`] 的期望一致。
pub struct FigWriter<'o> {
    options: &'o WriterOptions,
    output: Vec<String>,
}

impl<'o> FigWriter<'o> {
    pub fn new(options: &'o WriterOptions) -> Self {
        Self {
            options,
            output: Vec::new(),
        }
    }

    pub fn write_document(mut self, document: &Document) -> String {
        self.write_header(&document.page);
        for color in document.colors().iter() {
            let line = Fields::code(codes::CUSTOM_COLOR)
                .int(color.index)
                .raw(color.hex())
                .finish();
            self.output.push(line);
        }
        for object in document.objects() {
            self.write_object(object);
        }
        info!(
            objects = document.all_objects(false).count(),
            colors = document.colors().len(),
            lines = self.output.len(),
            "FIG 文档序列化完成"
        );
        self.finish()
    }

    fn finish(self) -> String {
        let mut text = self.output.join("\n");
        text.push('\n');
        text
    }

    fn push_continuation(&mut self, fields: Fields) {
        let line = format!("{}{}", self.options.continuation_indent, fields.finish());
        self.output.push(line);
    }

    fn write_header(&mut self, page: &PageSettings) {
        if !self.options.header_comment.is_empty() {
            self.output.push(self.options.header_comment.clone());
        }
        let header = [
            String::from(if page.landscape { "Landscape" } else { "Portrait" }),
            String::from(if page.centered { "Center" } else { "Flush Left" }),
            String::from(if page.metric { "Metric" } else { "Inches" }),
            page.paper_size.clone(),
            format_float(page.magnification),
            String::from(if page.single_page { "Single" } else { "Multiple" }),
            page.transparent_color.to_string(),
            format!("{} 2", page.resolution),
        ];
        self.output.extend(header);
    }

    fn write_object(&mut self, object: &Object) {
        match object {
            Object::Polyline(polyline) => self.write_polyline(polyline),
            Object::Spline(spline) => self.write_spline(spline),
            Object::Arc(arc) => self.write_arc(arc),
            Object::Ellipse(ellipse) => self.write_ellipse(ellipse),
            Object::Text(text) => self.write_text(text),
            Object::Compound(compound) => self.write_compound(compound),
        }
    }

    fn write_arrows(&mut self, style: &Style) {
        for arrow in [&style.forward_arrow, &style.backward_arrow]
            .into_iter()
            .flatten()
        {
            self.push_continuation(arrow_fields(arrow));
        }
    }

    fn write_points(&mut self, points: impl IntoIterator<Item = Point>) {
        let points: Vec<Point> = points.into_iter().collect();
        for chunk in points.chunks(POINTS_PER_LINE) {
            let fields = chunk
                .iter()
                .fold(Fields::default(), |fields, point| fields.point(*point));
            self.push_continuation(fields);
        }
    }

    fn write_polyline(&mut self, polyline: &Polyline) {
        let style = &polyline.style;
        let wire_count = polyline.wire_points().count();
        let primary = Fields::code(codes::POLYLINE)
            .int(polyline.kind.code())
            .style(style)
            .int(style.join_style)
            .int(style.cap_style)
            .int(polyline.corner_radius)
            .flag(style.forward_arrow.is_some())
            .flag(style.backward_arrow.is_some())
            .int(i32::try_from(wire_count).unwrap_or(i32::MAX))
            .finish();
        self.output.push(primary);
        self.write_arrows(style);
        if polyline.kind == PolylineKind::Picture {
            let picture = polyline.picture.clone().unwrap_or_default();
            self.push_continuation(Fields::default().flag(picture.flipped).raw(picture.filename));
        }
        self.write_points(polyline.wire_points());
    }

    fn write_spline(&mut self, spline: &Spline) {
        let style = &spline.style;
        let count = spline.points.len();
        let primary = Fields::code(codes::SPLINE)
            .int(spline.kind.code(spline.closed))
            .style(style)
            .int(style.cap_style)
            .flag(style.forward_arrow.is_some())
            .flag(style.backward_arrow.is_some())
            .int(i32::try_from(count).unwrap_or(i32::MAX))
            .finish();
        self.output.push(primary);
        self.write_arrows(style);
        self.write_points(spline.points.iter().copied());

        let factors: Vec<f64> = (0..count).map(|index| spline.shape_factor(index)).collect();
        for chunk in factors.chunks(FACTORS_PER_LINE) {
            let fields = chunk
                .iter()
                .fold(Fields::default(), |fields, factor| fields.float(*factor));
            self.push_continuation(fields);
        }
    }

    fn write_arc(&mut self, arc: &Arc) {
        let style = &arc.style;
        let [p1, p2, p3] = arc.points;
        let primary = Fields::code(codes::ARC)
            .int(arc.kind.code())
            .style(style)
            .int(style.cap_style)
            .int(arc.direction.code())
            .flag(style.forward_arrow.is_some())
            .flag(style.backward_arrow.is_some())
            .float(arc.center.x)
            .float(arc.center.y)
            .point(p1)
            .point(p2)
            .point(p3)
            .finish();
        self.output.push(primary);
        self.write_arrows(style);
    }

    fn write_ellipse(&mut self, ellipse: &Ellipse) {
        let line = Fields::code(codes::ELLIPSE)
            .int(ellipse.shape.code())
            .style(&ellipse.style)
            .int(1)
            .float(ellipse.angle)
            .point(ellipse.center)
            .int(ellipse.radius.x)
            .int(ellipse.radius.y)
            .point(ellipse.start)
            .point(ellipse.end)
            .finish();
        self.output.push(line);
    }

    fn write_text(&mut self, text: &Text) {
        let line = Fields::code(codes::TEXT)
            .int(text.alignment.code())
            .int(text.style.pen_color)
            .int(text.style.depth)
            .int(text.style.pen_style)
            .int(text.font)
            .rounded(text.font_size)
            .float(text.angle)
            .int(text.font_flags)
            .rounded(text.height)
            .rounded(text.length)
            .point(text.position)
            .raw(format!("{}\\001", text.text))
            .finish();
        self.output.push(line);
    }

    fn write_compound(&mut self, compound: &Compound) {
        if !self.options.emit_empty_compounds && is_blank(compound) {
            debug!("跳过空组合");
            return;
        }
        let mut bounds = Rect::empty();
        for child in compound.children() {
            bounds.include_rect(&child.bounds());
        }
        let begin = Fields::code(codes::COMPOUND_BEGIN)
            .point(bounds.upper_left())
            .point(bounds.lower_right())
            .finish();
        self.output.push(begin);
        for child in compound.children() {
            self.write_object(child);
        }
        self.output.push(codes::COMPOUND_END.to_string());
    }
}

fn arrow_fields(arrow: &Arrow) -> Fields {
    Fields::code(arrow.kind)
        .int(arrow.style)
        .float(arrow.thickness)
        .float(arrow.width)
        .float(arrow.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fig_core::document::Alignment;

    fn write(document: &Document) -> String {
        FigWriter::new(&WriterOptions::default()).write_document(document)
    }

    fn body(text: &str) -> Vec<&str> {
        text.lines().skip(9).collect()
    }

    #[test]
    fn floats_follow_shortest_repr_with_integral_point_zero() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1234.5678), "1234.5678");
    }

    #[test]
    fn default_document_writes_nine_header_lines() {
        let text = write(&Document::new());
        assert_eq!(
            text,
            "#FIG 3.2\nPortrait\nCenter\nMetric\nA4\n100.0\nSingle\n-2\n1200 2\n"
        );
    }

    #[test]
    fn header_comment_can_be_suppressed() {
        let options = WriterOptions {
            header_comment: String::new(),
            ..WriterOptions::default()
        };
        let text = FigWriter::new(&options).write_document(&Document::new());
        assert_eq!(text.lines().next(), Some("Portrait"));
    }

    #[test]
    fn custom_colors_precede_objects() {
        let mut doc = Document::new();
        doc.colors_mut().add_color("#A0B0C0").unwrap();
        doc.append(Polyline::open(vec![Point::new(0, 0), Point::new(1, 1)]));
        let text = write(&doc);
        let lines = body(&text);
        assert_eq!(lines[0], "0 32 #a0b0c0");
        assert!(lines[1].starts_with("2 1 "));
    }

    #[test]
    fn closed_box_repeats_first_point() {
        let mut doc = Document::new();
        doc.append(Polyline::rect(0, 0, 100, 50));
        let text = write(&doc);
        assert_eq!(
            body(&text),
            [
                "2 2 -1 1 -1 -1 50 0 -1 3.0 0 0 -1 0 0 5",
                "\t0 0 100 0 100 50 0 50 0 0",
            ]
        );
    }

    #[test]
    fn long_point_lists_wrap_at_six_pairs() {
        let points: Vec<Point> = (0..13).map(|i| Point::new(i, i)).collect();
        let mut polyline = Polyline::open(points);
        polyline.style.forward_arrow = Some(Arrow::default());
        polyline.style.backward_arrow = Some(Arrow::default());
        let mut doc = Document::new();
        doc.append(polyline);
        let text = write(&doc);
        let lines = body(&text);
        assert_eq!(lines.len(), 1 + 2 + 3);
        assert_eq!(lines[1], "\t0 0 1.0 60.0 120.0");
        assert_eq!(lines[5], "\t12 12");
    }

    #[test]
    fn picture_line_follows_arrows() {
        let mut picture = Polyline::picture(0, 0, 10, 10, "photo.jpg", true);
        picture.style.forward_arrow = Some(Arrow::default());
        assert_eq!(picture.kind, PolylineKind::Picture);
        let mut doc = Document::new();
        doc.append(picture);
        let text = write(&doc);
        let lines = body(&text);
        assert!(lines[1].starts_with("\t0 0 "));
        assert_eq!(lines[2], "\t1 photo.jpg");
        assert_eq!(lines[3], "\t0 0 10 0 10 10 0 10 0 0");
    }

    #[test]
    fn text_rounds_size_fields_and_appends_terminator() {
        let mut text = Text::new(Point::new(10, 20), "Hello", Alignment::Right);
        text.font_size = 10.6;
        text.angle = 1.5;
        let mut doc = Document::new();
        doc.append(text);
        let output = write(&doc);
        assert_eq!(
            body(&output),
            ["4 2 -1 50 0 -1 11 1.5 4 136 100 10 20 Hello\\001"]
        );
    }

    #[test]
    fn empty_compounds_are_dropped_unless_requested() {
        let mut outer = Compound::new();
        outer.push(Compound::new());
        let mut doc = Document::new();
        doc.append(outer);
        assert!(body(&write(&doc)).is_empty());

        let options = WriterOptions {
            emit_empty_compounds: true,
            ..WriterOptions::default()
        };
        let text = FigWriter::new(&options).write_document(&doc);
        assert_eq!(body(&text), ["6 0 0 0 0", "6 0 0 0 0", "-6", "-6"]);
    }
}
