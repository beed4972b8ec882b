//! Push dive steps to consumers while a profile is iterated.

use super::error::Result;
use super::step::Step;

/// Receives every dive step of a profile, in order.
pub trait StepConsumer {
    /// Consume a dive step. An error stops the pipeline.
    fn send(&mut self, step: &Step) -> Result<()>;
}

/// Sends each dive step of a source to all consumers, then yields it.
///
/// Consumers are called in registration order. The first error, from the
/// source or a consumer, is yielded and ends the pipeline.
pub struct Sender<'c, I> {
    source: I,
    consumers: Vec<&'c mut dyn StepConsumer>,
    halted: bool,
}

impl<'c, I> Sender<'c, I>
where
    I: Iterator<Item = Result<Step>>,
{
    pub fn new(source: I, consumers: Vec<&'c mut dyn StepConsumer>) -> Self {
        Self {
            source,
            consumers,
            halted: false,
        }
    }

    /// Drain the pipeline, keeping the dive steps.
    pub fn run(self) -> Result<Vec<Step>> {
        self.collect()
    }
}

impl<I> Iterator for Sender<'_, I>
where
    I: Iterator<Item = Result<Step>>,
{
    type Item = Result<Step>;

    fn next(&mut self) -> Option<Result<Step>> {
        if self.halted {
            return None;
        }
        let result = self.source.next()?.and_then(|step| {
            for consumer in self.consumers.iter_mut() {
                consumer.send(&step)?;
            }
            Ok(step)
        });
        if result.is_err() {
            self.halted = true;
        }
        Some(result)
    }
}
