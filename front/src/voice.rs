use ripple_api::v1::Todo;
use uuid::Uuid;

/// Intent recognized from a speech transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceCommand {
    Add { title: String },
    Complete { id: Uuid },
    /// Nothing matched; surfaced so the caller can give feedback instead of
    /// silently dropping the transcript.
    Unrecognized,
}

/// Maps a transcript to an intent. The transcript is lower-cased first;
/// "add" becomes a create with the remainder as title, "complete" toggles
/// the todo whose title equals the remainder, compared case-insensitively.
pub fn parse(transcript: &str, todos: &[Todo]) -> VoiceCommand {
    let transcript = transcript.to_lowercase();

    if transcript.contains("add") {
        let title = transcript.replacen("add", "", 1);
        let title = title.trim();

        if title.is_empty() {
            return VoiceCommand::Unrecognized;
        }

        return VoiceCommand::Add {
            title: title.to_string(),
        };
    }

    if transcript.contains("complete") {
        let title = transcript.replacen("complete", "", 1);
        let title = title.trim();

        let found = todos.iter().find(|todo| todo.title.to_lowercase() == title);

        return match found {
            Some(todo) => VoiceCommand::Complete { id: todo.id },
            None => VoiceCommand::Unrecognized,
        };
    }

    VoiceCommand::Unrecognized
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn todo(title: &str) -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: String::from(title),
            description: None,
            completed: false,
            priority: Default::default(),
            category: None,
            due_date: None,
            created_at: Utc::now(),
            recurring: None,
        }
    }

    #[test]
    fn add_strips_the_keyword_and_trims() {
        let command = parse("add buy milk", &[]);
        assert_eq!(
            command,
            VoiceCommand::Add {
                title: String::from("buy milk")
            }
        );
    }

    #[test]
    fn add_without_a_title_is_unrecognized() {
        assert_eq!(parse("add   ", &[]), VoiceCommand::Unrecognized);
    }

    #[test]
    fn complete_matches_titles_case_insensitively() {
        let todos = [todo("Buy milk"), todo("Buy bread")];

        let command = parse("Complete BUY MILK", &todos);
        assert_eq!(command, VoiceCommand::Complete { id: todos[0].id });
    }

    #[test]
    fn complete_requires_an_exact_title_match() {
        let todos = [todo("Buy milk")];

        assert_eq!(parse("complete milk", &todos), VoiceCommand::Unrecognized);
    }

    #[test]
    fn unrelated_transcripts_are_unrecognized() {
        assert_eq!(parse("turn off the lights", &[]), VoiceCommand::Unrecognized);
    }
}
