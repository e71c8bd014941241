//! Level-dependent rules text (`spec.md` §4.5's rules table).

use tasksmith_config::AutonomyLevel;

pub fn rules_text_for(level: AutonomyLevel) -> &'static str {
    match level {
        AutonomyLevel::None => "You have no tools; answer from knowledge only.",
        AutonomyLevel::Observe => {
            "You may read and run read-only commands; never propose writes."
        }
        AutonomyLevel::Workspace => {
            "You may read anywhere; writes are restricted to the workspace."
        }
        AutonomyLevel::Home => "You may read anywhere; writes are restricted to the user's home.",
        AutonomyLevel::Full => "You have full access; be careful with destructive operations.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_level_has_distinct_rules_text() {
        let levels = [
            AutonomyLevel::None,
            AutonomyLevel::Observe,
            AutonomyLevel::Workspace,
            AutonomyLevel::Home,
            AutonomyLevel::Full,
        ];
        let texts: Vec<&str> = levels.iter().map(|l| rules_text_for(*l)).collect();
        for (i, a) in texts.iter().enumerate() {
            for (j, b) in texts.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }
}
