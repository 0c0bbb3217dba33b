//! Lazy answer stream produced by a generator.
//!
//! A finite, non-restartable, pull-based sequence of text fragments. The
//! caller concatenates fragments in arrival order; dropping the stream
//! abandons the underlying generation call. Cancellation needs no cleanup
//! because the call is stateless per request.

use crate::Result;

/// Pull-based sequence of answer fragments.
///
/// Providers emit *events* whose payload may be a list of sub-fragments; the
/// stream flattens each event into one fragment and suppresses empty ones, so
/// consumers only ever see non-empty text.
pub struct AnswerStream {
    inner: Box<dyn Iterator<Item = Result<Vec<String>>> + Send>,
}

impl AnswerStream {
    /// Wrap a raw event source. Each event carries zero or more sub-fragments
    /// which are concatenated before emission.
    pub fn from_events<I>(events: I) -> Self
    where
        I: Iterator<Item = Result<Vec<String>>> + Send + 'static,
    {
        Self {
            inner: Box::new(events),
        }
    }

    /// Convenience for sources that already emit plain fragments.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: Iterator<Item = Result<String>> + Send + 'static,
    {
        Self::from_events(fragments.map(|fragment| fragment.map(|text| vec![text])))
    }

    /// An already-finished stream with no fragments.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_events(std::iter::empty())
    }

    /// Drain the stream, concatenating fragments in arrival order. Stops at
    /// the first transport error.
    pub fn collect_answer(self) -> Result<String> {
        let mut answer = String::new();
        for fragment in self {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

impl Iterator for AnswerStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(parts) => {
                    let fragment: String = parts.concat();
                    if fragment.is_empty() {
                        continue;
                    }
                    return Some(Ok(fragment));
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScreenerError;

    #[test]
    fn flattens_structured_events_and_drops_empty_ones() {
        let events = vec![
            Ok(vec!["Risk".to_string(), " level".to_string()]),
            Ok(vec![]),
            Ok(vec![String::new()]),
            Ok(vec![": High Risk".to_string()]),
        ];
        let fragments: Vec<String> = AnswerStream::from_events(events.into_iter())
            .map(|fragment| fragment.expect("fragment"))
            .collect();
        assert_eq!(fragments, vec!["Risk level", ": High Risk"]);
    }

    #[test]
    fn collect_concatenates_in_arrival_order() {
        let stream = AnswerStream::from_fragments(
            vec![Ok("a".to_string()), Ok("b".to_string()), Ok("c".to_string())].into_iter(),
        );
        assert_eq!(stream.collect_answer().expect("answer"), "abc");
    }

    #[test]
    fn collect_stops_at_first_error() {
        let stream = AnswerStream::from_fragments(
            vec![
                Ok("partial".to_string()),
                Err(ScreenerError::GenerationService {
                    reason: "connection reset".into(),
                }),
                Ok("never seen".to_string()),
            ]
            .into_iter(),
        );
        assert!(stream.collect_answer().is_err());
    }

    #[test]
    fn dropping_midway_stops_pulling() {
        // Infinite source: only termination by drop proves laziness.
        let mut stream =
            AnswerStream::from_fragments(std::iter::repeat_with(|| Ok("tick".to_string())));
        assert!(stream.next().is_some());
        drop(stream);
    }
}
