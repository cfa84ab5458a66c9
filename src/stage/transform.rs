// In: src/stage/transform.rs

/// A single transformation step, bound to one dedicated worker thread.
///
/// `process` runs synchronously and must be finished with the item when it
/// returns: the item is handed to the next stage right after. A panic inside
/// `process` is fatal to the stage.
pub trait Transform<T>: Send + 'static {
    fn process(&mut self, item: &mut T);
}

impl<T, F> Transform<T> for F
where
    F: FnMut(&mut T) + Send + 'static,
{
    fn process(&mut self, item: &mut T) {
        self(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AddTransform(i64);

    impl Transform<i64> for AddTransform {
        fn process(&mut self, item: &mut i64) {
            *item += self.0;
        }
    }

    #[test]
    fn test_struct_and_closure_transforms_share_the_trait() {
        let mut steps: Vec<Box<dyn Transform<i64>>> = vec![
            Box::new(AddTransform(5)),
            Box::new(|v: &mut i64| *v *= 2),
        ];

        let mut value = 1;
        for step in steps.iter_mut() {
            step.process(&mut value);
        }
        assert_eq!(value, 12);
    }

    #[test]
    fn test_closure_state_persists_between_calls() {
        let mut calls = 0u32;
        let mut counting = move |v: &mut u32| {
            calls += 1;
            *v = calls;
        };

        let mut value = 0;
        counting.process(&mut value);
        counting.process(&mut value);
        assert_eq!(value, 2);
    }
}
