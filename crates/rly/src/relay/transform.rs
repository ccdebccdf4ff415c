//! Dispatch from upstream events to relay actions.

use super::events::UpstreamEvent;

/// What the engine does with one decoded upstream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Forward a start marker.
    Start,
    /// Forward this text delta and append it to the transcript.
    Content(String),
    /// Record the authoritative output token count.
    OutputTokens(u64),
    /// The turn is complete: emit final usage and stop, then persist.
    Complete,
    /// Nothing to do.
    Skip,
}

/// Total mapping from upstream kinds to actions. Pure; the engine owns all
/// state this feeds into.
pub fn dispatch(event: UpstreamEvent) -> RelayAction {
    match event {
        UpstreamEvent::MessageStart => RelayAction::Start,
        UpstreamEvent::ContentBlockDelta { delta } => match delta.and_then(|d| d.text) {
            Some(text) if !text.is_empty() => RelayAction::Content(text),
            _ => RelayAction::Skip,
        },
        UpstreamEvent::MessageDelta { usage } => match usage.and_then(|u| u.output_tokens) {
            Some(count) => RelayAction::OutputTokens(count),
            None => RelayAction::Skip,
        },
        UpstreamEvent::MessageStop => RelayAction::Complete,
        UpstreamEvent::Ignored => RelayAction::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::events::{ContentDelta, UsageDelta};

    #[test]
    fn test_dispatch_table() {
        assert_eq!(dispatch(UpstreamEvent::MessageStart), RelayAction::Start);
        assert_eq!(dispatch(UpstreamEvent::MessageStop), RelayAction::Complete);
        assert_eq!(dispatch(UpstreamEvent::Ignored), RelayAction::Skip);

        let delta = UpstreamEvent::ContentBlockDelta {
            delta: Some(ContentDelta {
                text: Some("chunk".into()),
            }),
        };
        assert_eq!(dispatch(delta), RelayAction::Content("chunk".into()));

        let usage = UpstreamEvent::MessageDelta {
            usage: Some(UsageDelta {
                output_tokens: Some(9),
            }),
        };
        assert_eq!(dispatch(usage), RelayAction::OutputTokens(9));
    }

    #[test]
    fn test_empty_and_missing_deltas_are_skipped() {
        assert_eq!(
            dispatch(UpstreamEvent::ContentBlockDelta { delta: None }),
            RelayAction::Skip
        );
        assert_eq!(
            dispatch(UpstreamEvent::ContentBlockDelta {
                delta: Some(ContentDelta { text: None })
            }),
            RelayAction::Skip
        );
        assert_eq!(
            dispatch(UpstreamEvent::ContentBlockDelta {
                delta: Some(ContentDelta {
                    text: Some(String::new())
                })
            }),
            RelayAction::Skip
        );
        assert_eq!(
            dispatch(UpstreamEvent::MessageDelta { usage: None }),
            RelayAction::Skip
        );
        assert_eq!(
            dispatch(UpstreamEvent::MessageDelta {
                usage: Some(UsageDelta {
                    output_tokens: None
                })
            }),
            RelayAction::Skip
        );
    }
}
