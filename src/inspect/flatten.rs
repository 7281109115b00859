/// A possibly nested iterable whose leaves are atomic values.
///
/// Leaves are never expanded, so strings stay intact. Inner iterables are
/// boxed iterators, which lets sequences, sets and lazy generators nest
/// freely.
pub enum Nested<'a, T> {
    Leaf(T),
    Iter(Box<dyn Iterator<Item = Nested<'a, T>> + 'a>),
}

impl<'a, T: 'a> Nested<'a, T> {
    pub fn leaf(value: T) -> Self {
        Nested::Leaf(value)
    }

    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Nested<'a, T>>,
        I::IntoIter: 'a,
    {
        Nested::Iter(Box::new(items.into_iter()))
    }

    /// An iterable of plain leaves.
    pub fn leaves<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Nested::Iter(Box::new(values.into_iter().map(Nested::Leaf)))
    }
}

/// Lazily flattens nested iterables, yielding leaves in encounter order.
pub struct Flatten<'a, T> {
    stack: Vec<Box<dyn Iterator<Item = Nested<'a, T>> + 'a>>,
}

impl<'a, T> Iterator for Flatten<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Nested::Leaf(value)) => return Some(value),
                Some(Nested::Iter(inner)) => self.stack.push(inner),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

pub fn flatten<'a, T, I>(iterable: I) -> Flatten<'a, T>
where
    I: IntoIterator<Item = Nested<'a, T>>,
    I::IntoIter: 'a,
{
    Flatten {
        stack: vec![Box::new(iterable.into_iter())],
    }
}
