//! Simple wall-clock measurement of tool stages.

use log::trace;
use std::time::{Duration, Instant};

/// Accumulates time spent in one named stage.
#[derive(Debug)]
pub struct Stopwatch<'a> {
    runs: u64,
    total: Duration,
    last: Duration,
    name: &'a str,
    started: Option<Instant>,
}

impl<'a> Stopwatch<'a> {
    pub fn new(name: &'a str) -> Self {
        Stopwatch {
            runs: 0,
            total: Duration::default(),
            last: Duration::default(),
            name,
            started: None,
        }
    }

    /// Starts measuring.
    ///
    /// # Panics
    /// Panics if the stopwatch is already running.
    pub fn start(&mut self) {
        match self.started {
            Some(_) => panic!("Stopwatch {} must end() before start()-ing again!", self.name),
            None => self.started = Some(Instant::now()),
        }
    }

    /// Stops measuring and records the elapsed time.
    ///
    /// # Panics
    /// Panics if the stopwatch is not running.
    pub fn end(&mut self) {
        match self.started.take() {
            None => panic!("Stopwatch {} must start() before end()-ing!", self.name),
            Some(s) => {
                self.last = s.elapsed();
                self.total += self.last;
                self.runs += 1;
                trace!("{} took {:?}", self.name, self.last);
            }
        }
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    #[inline]
    pub fn total_time(&self) -> Duration {
        self.total
    }

    #[inline]
    pub fn last_time(&self) -> Duration {
        self.last
    }
}

/// Generates a struct with one `Stopwatch` per listed stage and a `Default`
/// implementation naming each stopwatch after its field.
///
/// ```rust
/// use common::impl_stats_struct;
///
/// impl_stats_struct!(pub Statistics; decode, merge, encode);
///
/// let stats = Statistics::default();
/// assert_eq!(stats.merge.name(), "merge");
/// ```
#[macro_export]
macro_rules! impl_stats_struct {
    (pub $name: ident; $($it: ident),+) => {
        #[derive(Debug)]
        pub struct $name<'a> {
            $(pub $it: $crate::perf::Stopwatch<'a>,)+
        }

        impl<'a> Default for $name<'a> {
            fn default() -> Self {
                $name {
                    $($it: $crate::perf::Stopwatch::new(stringify!($it)),)+
                }
            }
        }

        impl<'a> $name<'a> {
            /// Returns `(name, total time)` of every stage in declaration order.
            pub fn stages(&self) -> Vec<(&'a str, std::time::Duration)> {
                vec![$((self.$it.name(), self.$it.total_time()),)+]
            }
        }
    };
}

/// Measures the rest of the current scope with specified `Stopwatch`. The
/// `end()` call happens when the guard is dropped.
#[macro_export]
macro_rules! measure_scope {
    ($stopwatch: expr) => {
        struct ScopedMeasure<'a, 'b>(&'b mut $crate::perf::Stopwatch<'a>);
        impl<'a, 'b> Drop for ScopedMeasure<'a, 'b> {
            fn drop(&mut self) {
                self.0.end();
            }
        }
        $stopwatch.start();
        #[allow(unused)]
        let scoped = ScopedMeasure(&mut $stopwatch);
    };
}

#[cfg(test)]
mod tests {
    use crate::perf::Stopwatch;
    use std::thread::sleep;
    use std::time::Duration;

    crate::impl_stats_struct!(pub Stats; first, second);

    #[test]
    fn new_stopwatch_is_empty() {
        let watch = Stopwatch::new("decode");

        assert_eq!(watch.runs(), 0);
        assert_eq!(watch.total_time(), Duration::default());
        assert_eq!(watch.name(), "decode");
    }

    #[test]
    fn stopwatch_accumulates() {
        let mut watch = Stopwatch::new("merge");

        watch.start();
        sleep(Duration::from_millis(5));
        watch.end();
        watch.start();
        watch.end();

        assert_eq!(watch.runs(), 2);
        assert!(watch.total_time() >= Duration::from_millis(5));
        assert!(watch.last_time() <= watch.total_time());
    }

    #[test]
    #[should_panic]
    fn double_start_panics() {
        let mut watch = Stopwatch::new("encode");
        watch.start();
        watch.start();
    }

    #[test]
    #[should_panic]
    fn end_without_start_panics() {
        Stopwatch::new("encode").end();
    }

    #[test]
    fn scope_is_measured() {
        let mut stats = Stats::default();
        {
            measure_scope!(stats.second);
        }

        assert_eq!(stats.first.runs(), 0);
        assert_eq!(stats.second.runs(), 1);
        assert_eq!(
            stats.stages().iter().map(|s| s.0).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
    }
}
