//! Instrumented row sources.

use crate::{Bindings, Row};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Generator = Arc<dyn Fn(usize) -> Row + Send + Sync>;

/// A bindable source that counts how often it is opened and how many rows
/// were pulled from it, across every stream it has handed out.
///
/// Rows are produced on demand, so a generated source of a million rows
/// costs nothing until pulled.
///
/// # Example
///
/// ```
/// use boundflow::*;
/// use boundflow::testing::CountingSource;
///
/// # fn main() -> anyhow::Result<()> {
/// let source = CountingSource::generated(1_000, |i| row! { "i" => i });
/// let graph = graph_from_iter("numbers");
/// let mut rows = graph.run(&source.bind_to(Bindings::new(), "numbers"))?;
///
/// assert_eq!(source.opened(), 0);
/// rows.next().transpose()?;
/// assert_eq!((source.opened(), source.pulled()), (1, 1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CountingSource {
    len: usize,
    generate: Generator,
    pulled: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl CountingSource {
    /// Source over a fixed set of rows.
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        let rows: Arc<[Row]> = rows.into();
        Self::with_generator(rows.len(), Arc::new(move |i| rows[i].clone()))
    }

    /// Source of `len` rows, row `i` produced by `generate(i)` when pulled.
    #[must_use]
    pub fn generated(len: usize, generate: impl Fn(usize) -> Row + Send + Sync + 'static) -> Self {
        Self::with_generator(len, Arc::new(generate))
    }

    fn with_generator(len: usize, generate: Generator) -> Self {
        Self {
            len,
            generate,
            pulled: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Rows pulled so far, summed over every opened stream.
    #[must_use]
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::Relaxed)
    }

    /// Streams opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Zero both counters.
    pub fn reset(&self) {
        self.pulled.store(0, Ordering::Relaxed);
        self.opened.store(0, Ordering::Relaxed);
    }

    /// Factory suitable for [`Bindings::bind`].
    pub fn factory(&self) -> impl Fn() -> Box<dyn Iterator<Item = Row>> + Send + Sync + 'static {
        let source = self.clone();
        move || {
            source.opened.fetch_add(1, Ordering::Relaxed);
            let (generate, pulled) = (Arc::clone(&source.generate), Arc::clone(&source.pulled));
            Box::new((0..source.len).map(move |i| {
                pulled.fetch_add(1, Ordering::Relaxed);
                generate(i)
            })) as Box<dyn Iterator<Item = Row>>
        }
    }

    /// Add this source to `bindings` under `name`.
    #[must_use]
    pub fn bind_to(&self, bindings: Bindings, name: impl Into<String>) -> Bindings {
        bindings.bind(name, self.factory())
    }
}

impl std::fmt::Debug for CountingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingSource")
            .field("len", &self.len)
            .field("pulled", &self.pulled())
            .field("opened", &self.opened())
            .finish_non_exhaustive()
    }
}
