/// A recognized command: the verb after the prefix and the trimmed rest of
/// the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub argument: String,
}

impl Command {
    pub fn new(verb: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            argument: argument.into(),
        }
    }
}
