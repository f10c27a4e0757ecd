//! 对象容器与查询。
//!
//! 文档与组合对象都实现 [`Container`]，对象以 [`ObjectPath`]（逐层下标）定位，
//! 不保存父指针。

use std::collections::BTreeSet;
use std::fmt;
use std::iter::Enumerate;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::document::{AttrName, AttrValue, Object, ObjectKind};
use crate::errors::CoreError;

/// 从容器根开始的逐层下标。
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectPath(pub Vec<usize>);

impl ObjectPath {
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// `self` 是否为 `other` 的祖先（不含自身）。
    pub fn is_ancestor_of(&self, other: &ObjectPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// 深度优先遍历，每层保留一个游标。
pub struct AllObjects<'a> {
    stack: Vec<Enumerate<slice::Iter<'a, Object>>>,
    prefix: Vec<usize>,
    include_compounds: bool,
}

impl<'a> AllObjects<'a> {
    pub fn new(objects: &'a [Object], include_compounds: bool) -> Self {
        Self {
            stack: vec![objects.iter().enumerate()],
            prefix: Vec::new(),
            include_compounds,
        }
    }
}

impl<'a> Iterator for AllObjects<'a> {
    type Item = (ObjectPath, &'a Object);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.stack.last_mut()?;
            let Some((index, object)) = cursor.next() else {
                self.stack.pop();
                self.prefix.pop();
                continue;
            };

            let mut path = self.prefix.clone();
            path.push(index);

            if let Object::Compound(compound) = object {
                self.stack.push(compound.children().iter().enumerate());
                self.prefix.push(index);
                if !self.include_compounds {
                    continue;
                }
            }
            return Some((ObjectPath(path), object));
        }
    }
}

/// 查询条件：所有条件同时满足才算匹配。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    kind: Option<ObjectKind>,
    attributes: Vec<(AttrName, AttrValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: ObjectKind) -> Self {
        Self {
            kind: Some(kind),
            attributes: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with(mut self, name: AttrName, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn matches(&self, object: &Object) -> bool {
        if self.kind.is_some_and(|kind| kind != object.kind()) {
            return false;
        }
        self.attributes
            .iter()
            .all(|(name, value)| object.get(*name).as_ref() == Some(value))
    }

    /// 只有显式按组合类型查询时才遍历到组合节点本身。
    fn includes_compounds(&self) -> bool {
        self.kind == Some(ObjectKind::Compound)
    }
}

/// 有序对象集合。
pub trait Container {
    fn objects(&self) -> &[Object];

    fn child_mut(&mut self, index: usize) -> Option<&mut Object>;

    fn take_child(&mut self, index: usize) -> Option<Object>;

    /// 子对象被修改或移除后调用。
    fn children_changed(&mut self) {}

    #[inline]
    fn len(&self) -> usize {
        self.objects().len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    fn all_objects(&self, include_compounds: bool) -> AllObjects<'_> {
        AllObjects::new(self.objects(), include_compounds)
    }

    fn object_at(&self, path: &ObjectPath) -> Option<&Object> {
        let (first, rest) = path.indices().split_first()?;
        let mut object = self.objects().get(*first)?;
        for index in rest {
            match object {
                Object::Compound(compound) => object = compound.children().get(*index)?,
                _ => return None,
            }
        }
        Some(object)
    }

    /// 原地修改路径上的对象，沿途各层组合对象会刷新包围盒。
    fn update_at<R>(
        &mut self,
        path: &ObjectPath,
        update: impl FnOnce(&mut Object) -> R,
    ) -> Option<R> {
        update_in(self, path.indices(), update)
    }

    fn find_paths(&self, query: &Query) -> Vec<ObjectPath> {
        self.all_objects(query.includes_compounds())
            .filter(|(_, object)| query.matches(object))
            .map(|(path, _)| path)
            .collect()
    }

    fn find_objects(&mut self, query: &Query) -> Selection<'_, Self>
    where
        Self: Sized,
    {
        let paths = self.find_paths(query);
        Selection {
            container: self,
            paths,
        }
    }

    fn layer(&mut self, depth: i32) -> Selection<'_, Self>
    where
        Self: Sized,
    {
        self.find_objects(&Query::new().with(AttrName::Depth, depth))
    }

    /// 升序去重的深度列表。
    fn layers(&self) -> Vec<i32> {
        self.all_objects(false)
            .filter_map(|(_, object)| object.depth())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn remove(&mut self, path: &ObjectPath) -> Result<Object, CoreError> {
        remove_in(self, path.indices()).ok_or_else(|| CoreError::ObjectNotFound(path.clone()))
    }
}

fn update_in<C, R>(
    container: &mut C,
    path: &[usize],
    update: impl FnOnce(&mut Object) -> R,
) -> Option<R>
where
    C: Container + ?Sized,
{
    let (first, rest) = path.split_first()?;
    let child = container.child_mut(*first)?;
    let result = if rest.is_empty() {
        update(child)
    } else {
        match child {
            Object::Compound(compound) => update_in(compound, rest, update)?,
            _ => return None,
        }
    };
    container.children_changed();
    Some(result)
}

fn remove_in<C>(container: &mut C, path: &[usize]) -> Option<Object>
where
    C: Container + ?Sized,
{
    let (first, rest) = path.split_first()?;
    let removed = if rest.is_empty() {
        container.take_child(*first)?
    } else {
        match container.child_mut(*first)? {
            Object::Compound(compound) => remove_in(compound, rest)?,
            _ => return None,
        }
    };
    container.children_changed();
    Some(removed)
}

/// 查询结果视图，支持批量赋值与批量移除。
pub struct Selection<'a, C: Container> {
    container: &'a mut C,
    paths: Vec<ObjectPath>,
}

impl<'a, C: Container> Selection<'a, C> {
    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    pub fn paths(&self) -> &[ObjectPath] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> + '_ {
        self.paths
            .iter()
            .filter_map(|path| self.container.object_at(path))
    }

    /// 并入另一查询的结果，保持文档顺序。
    pub fn or(mut self, query: &Query) -> Self {
        let extra = self.container.find_paths(query);
        let mut merged: BTreeSet<ObjectPath> = self.paths.drain(..).collect();
        merged.extend(extra);
        self.paths = merged.into_iter().collect();
        self
    }

    /// 对具备该属性的对象赋值，返回实际修改的数量。
    pub fn set(&mut self, name: AttrName, value: impl Into<AttrValue>) -> usize {
        let value = value.into();
        let mut changed = 0;
        for path in &self.paths {
            if self
                .container
                .update_at(path, |object| object.set(name, value))
                .unwrap_or(false)
            {
                changed += 1;
            }
        }
        changed
    }

    /// 所有具备该属性的对象取值相同时返回该值。
    pub fn common(&self, name: AttrName) -> Option<AttrValue> {
        let mut values = self.iter().filter_map(|object| object.get(name));
        let first = values.next()?;
        values.all(|value| value == first).then_some(first)
    }

    /// 从各自所属的容器中移除，按文档顺序返回被移除的对象。
    ///
    /// 祖先已被选中时后代随祖先一起移除，不单独返回。
    pub fn remove(self) -> Vec<Object> {
        let mut roots: Vec<&ObjectPath> = Vec::new();
        for path in &self.paths {
            if !roots.iter().any(|root| root.is_ancestor_of(path)) {
                roots.push(path);
            }
        }
        let mut removed: Vec<Object> = roots
            .iter()
            .rev()
            .filter_map(|path| self.container.remove(path).ok())
            .collect();
        removed.reverse();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Compound, Document, Ellipse, Polyline, Text, Alignment};
    use crate::geometry::{Point, Rect};

    fn with_depth(object: impl Into<Object>, depth: i32) -> Object {
        let mut object = object.into();
        object.set(AttrName::Depth, depth.into());
        object
    }

    /// `[rect@50, {ellipse@40, {text@50}}, line@30]`
    fn sample() -> Document {
        let mut inner = Compound::new();
        inner.push(with_depth(
            Text::new(Point::new(0, 0), "deep", Alignment::Left),
            50,
        ));
        let mut outer = Compound::new();
        outer.push(with_depth(Ellipse::circle(Point::new(100, 100), 10), 40));
        outer.push(inner);

        let mut doc = Document::new();
        doc.append(with_depth(Polyline::rect(0, 0, 10, 10), 50));
        doc.append(outer);
        doc.append(with_depth(
            Polyline::open(vec![Point::new(0, 0), Point::new(500, 0)]),
            30,
        ));
        doc
    }

    #[test]
    fn traversal_is_depth_first_pre_order() {
        let doc = sample();
        let leaves: Vec<String> = doc
            .all_objects(false)
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(leaves, ["/0", "/1/0", "/1/1/0", "/2"]);

        let all: Vec<String> = doc
            .all_objects(true)
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(all, ["/0", "/1", "/1/0", "/1/1", "/1/1/0", "/2"]);
    }

    #[test]
    fn traversal_restarts_on_each_call() {
        let doc = sample();
        assert_eq!(doc.all_objects(false).count(), 4);
        assert_eq!(doc.all_objects(false).count(), 4);
        assert_eq!(Document::new().all_objects(true).count(), 0);
    }

    #[test]
    fn query_combines_kind_and_attributes() {
        let mut doc = sample();
        let found = doc.find_paths(&Query::of_kind(ObjectKind::Polyline).with(AttrName::Depth, 50));
        assert_eq!(found, [ObjectPath::new([0])]);

        let compounds = doc.find_objects(&Query::of_kind(ObjectKind::Compound));
        assert_eq!(compounds.len(), 2);

        let nothing = doc.find_paths(&Query::new().with(AttrName::CornerRadius, 99));
        assert!(nothing.is_empty());
    }

    #[test]
    fn layers_are_sorted_and_distinct() {
        let mut doc = sample();
        assert_eq!(doc.layers(), [30, 40, 50]);
        let layer = doc.layer(50);
        assert_eq!(
            layer.paths(),
            [ObjectPath::new([0]), ObjectPath::new([1, 1, 0])]
        );
    }

    #[test]
    fn bulk_set_only_touches_objects_with_the_attribute() {
        let mut doc = sample();
        let mut selection = doc.find_objects(&Query::new());
        assert_eq!(selection.len(), 4);
        assert_eq!(selection.common(AttrName::Depth), None);
        assert_eq!(selection.set(AttrName::PenColor, 4), 4);
        assert_eq!(selection.common(AttrName::PenColor), Some(AttrValue::Int(4)));
        assert_eq!(selection.set(AttrName::FontSize, 20.0), 1);

        let text = doc.object_at(&ObjectPath::new([1, 1, 0])).unwrap();
        assert_eq!(text.get(AttrName::FontSize), Some(AttrValue::Float(20.0)));
    }

    #[test]
    fn nested_updates_refresh_compound_bounds() {
        let mut doc = sample();
        let before = doc.object_at(&ObjectPath::new([1])).unwrap().bounds();
        assert_eq!(before, Rect::new(0, -136, 110, 110));

        doc.update_at(&ObjectPath::new([1, 0]), |object| {
            if let Object::Ellipse(ellipse) = object {
                ellipse.center = Point::new(1000, 1000);
            }
        });
        let after = doc.object_at(&ObjectPath::new([1])).unwrap().bounds();
        assert_eq!(after, Rect::new(0, -136, 1010, 1010));
    }

    #[test]
    fn remove_reaches_into_nested_compounds() {
        let mut doc = sample();
        let removed = doc.remove(&ObjectPath::new([1, 1, 0])).unwrap();
        assert!(matches!(removed, Object::Text(_)));
        assert_eq!(doc.all_objects(false).count(), 3);

        let missing = doc.remove(&ObjectPath::new([1, 1, 0]));
        assert_eq!(
            missing,
            Err(CoreError::ObjectNotFound(ObjectPath::new([1, 1, 0])))
        );
        assert!(doc.remove(&ObjectPath::new([0, 0])).is_err());
        assert!(doc.remove(&ObjectPath::default()).is_err());
    }

    #[test]
    fn selection_remove_keeps_remaining_order() {
        let mut doc = sample();
        let removed = doc.layer(50).remove();
        assert_eq!(removed.len(), 2);
        assert!(matches!(removed[0], Object::Polyline(_)));
        assert!(matches!(removed[1], Object::Text(_)));

        let depths: Vec<i32> = doc
            .all_objects(false)
            .filter_map(|(_, object)| object.depth())
            .collect();
        assert_eq!(depths, [40, 30]);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn selection_union_skips_descendants_of_removed_groups() {
        let mut doc = sample();
        let selection = doc
            .find_objects(&Query::new().with(AttrName::Depth, 30))
            .or(&Query::of_kind(ObjectKind::Compound))
            .or(&Query::new().with(AttrName::Depth, 40));
        assert_eq!(
            selection.paths(),
            [
                ObjectPath::new([1]),
                ObjectPath::new([1, 0]),
                ObjectPath::new([1, 1]),
                ObjectPath::new([2]),
            ]
        );
        let removed = selection.remove();
        assert_eq!(removed.len(), 2);
        assert_eq!(doc.len(), 1);
    }
}
