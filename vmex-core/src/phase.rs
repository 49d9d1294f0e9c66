/// Timed segments of a single trial, in traversal order.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrialPhase {
    Fixation,
    Ready,
    Go,
    PostGo,
    InterTrialInterval,
}

impl TrialPhase {
    /// The four frame-sampled phases; the inter-trial interval is a plain wait.
    pub const SAMPLED: [TrialPhase; 4] = [
        TrialPhase::Fixation,
        TrialPhase::Ready,
        TrialPhase::Go,
        TrialPhase::PostGo,
    ];

    /// Movement flags are only evaluated while the go cue is up.
    pub fn evaluates_movement(&self) -> bool {
        matches!(self, TrialPhase::Go)
    }

    pub fn shows_cursor(&self) -> bool {
        matches!(self, TrialPhase::Ready | TrialPhase::Go)
    }

    pub fn shows_target(&self) -> bool {
        !matches!(self, TrialPhase::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrialPhase::Fixation => "fixation",
            TrialPhase::Ready => "ready",
            TrialPhase::Go => "go",
            TrialPhase::PostGo => "post_go",
            TrialPhase::InterTrialInterval => "iti",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_phases_have_distinct_labels() {
        let labels: Vec<_> = TrialPhase::SAMPLED.iter().map(TrialPhase::label).collect();
        assert_eq!(labels, vec!["fixation", "ready", "go", "post_go"]);
        assert!(!TrialPhase::SAMPLED.contains(&TrialPhase::InterTrialInterval));
    }

    #[test]
    fn only_go_evaluates_movement() {
        let evaluating: Vec<_> = TrialPhase::SAMPLED
            .iter()
            .filter(|p| p.evaluates_movement())
            .collect();
        assert_eq!(evaluating, vec![&TrialPhase::Go]);
    }

    #[test]
    fn ready_shows_cursor_but_not_target() {
        assert!(TrialPhase::Ready.shows_cursor());
        assert!(!TrialPhase::Ready.shows_target());
        assert!(!TrialPhase::Fixation.shows_cursor());
        assert!(!TrialPhase::PostGo.shows_cursor());
    }
}
