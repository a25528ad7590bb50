//! Small shared helpers.

/// A monotonic counter with id recycling: freed ids are handed back out
/// before the counter advances. Grounded directly in Alloy's
/// `RecycledCounter<T>` (`Containers/RecycledCounter.h`); used here for
/// process-wide space ids (see `world.rs`) the same way `EntityManager`
/// uses the same pattern for entity ids (`entity.rs`).
#[derive(Default)]
pub struct RecycledCounter {
    free: Vec<usize>,
    next: usize,
}

impl RecycledCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_next_id(&mut self) -> usize {
        self.free.pop().unwrap_or_else(|| {
            let id = self.next;
            self.next += 1;
            id
        })
    }

    pub fn recycle_id(&mut self, id: usize) {
        self.free.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_recycled_ids_before_advancing() {
        let mut counter = RecycledCounter::new();
        let a = counter.get_next_id();
        let b = counter.get_next_id();
        counter.recycle_id(a);
        let c = counter.get_next_id();
        assert_eq!(c, a);
        let d = counter.get_next_id();
        assert_eq!(d, b + 1);
    }
}
