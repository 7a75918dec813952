/// ## Staged Array
///
/// An append-order-preserving list partitioned by an integer stage.
///
/// Lower stages sit to the left, higher stages to the right, and items sharing
/// a stage keep the order they were appended in. Handlers and parameter
/// branches are both stored this way so that registration priority is a single
/// number instead of a pile of flags.
///
/// ### Example
///
/// ```
/// use radix_web::web::routing::staged::StagedArray;
///
/// let mut stages = StagedArray::new();
///
/// stages.append(10, "late");
/// stages.append(-5, "early");
/// stages.append(0, "normal");
///
/// let view: Vec<_> = stages.ordered().copied().collect();
/// assert_eq!(view, vec!["early", "normal", "late"]);
/// ```
#[derive(Clone, Debug)]
pub struct StagedArray<T> {
    items: Vec<(i32, T)>,
}

impl<T> Default for StagedArray<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> StagedArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item at the given stage, after every item whose stage is less
    /// than or equal to it.
    pub fn append(&mut self, stage: i32, item: T) {
        let position = self
            .items
            .partition_point(|(existing, _)| *existing <= stage);

        self.items.insert(position, (stage, item));
    }

    /// Append a whole collection at one stage, keeping its order.
    pub fn append_all(&mut self, stage: i32, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.append(stage, item);
        }
    }

    /// View in canonical order: stage ascending, insertion order on ties.
    pub fn ordered(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge several arrays by stage alone.
    ///
    /// When items from different arrays share a stage, every item of the
    /// earlier array comes first; within one array insertion order is kept.
    /// The sort behind this must be stable, which `sort_by_key` is.
    pub fn merge_sorted(sources: &[&StagedArray<T>]) -> Vec<T>
    where
        T: Clone,
    {
        let mut tagged: Vec<(i32, T)> = Vec::new();

        for source in sources {
            tagged.extend(source.items.iter().cloned());
        }

        tagged.sort_by_key(|(stage, _)| *stage);

        tagged.into_iter().map(|(_, item)| item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::StagedArray;

    #[test]
    fn append_partitions_by_stage() {
        let mut stages = StagedArray::new();

        stages.append(0, "m0");
        stages.append(10, "m10");
        stages.append(-5, "m-5");
        stages.append(5, "m5");

        let view: Vec<_> = stages.ordered().copied().collect();

        assert_eq!(view, vec!["m-5", "m0", "m5", "m10"]);
        assert_eq!(stages.len(), 4);
        assert!(!stages.is_empty());
    }

    #[test]
    fn equal_stages_keep_insertion_order() {
        let mut stages = StagedArray::new();

        stages.append(0, "first");
        stages.append(0, "second");
        stages.append(0, "third");

        let view: Vec<_> = stages.ordered().copied().collect();

        assert_eq!(view, vec!["first", "second", "third"]);
    }

    #[test]
    fn merge_prefers_earlier_instance_on_ties() {
        let mut left = StagedArray::new();
        let mut right = StagedArray::new();

        left.append(0, "left-a");
        left.append(0, "left-b");
        left.append(7, "left-late");
        right.append(-1, "right-early");
        right.append(0, "right-a");

        let merged = StagedArray::merge_sorted(&[&left, &right]);

        assert_eq!(
            merged,
            vec!["right-early", "left-a", "left-b", "right-a", "left-late"]
        );
    }

    #[test]
    fn merge_of_empty_inputs_is_empty() {
        let left: StagedArray<u8> = StagedArray::new();
        let right: StagedArray<u8> = StagedArray::new();

        assert!(StagedArray::merge_sorted(&[&left, &right]).is_empty());
        assert!(StagedArray::<u8>::merge_sorted(&[]).is_empty());
    }
}
