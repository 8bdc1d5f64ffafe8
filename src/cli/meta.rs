//! Dot-prefixed commands that inspect or close the table.

/// A recognised meta command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetaCommand {
    /// Close the table and leave the loop.
    Exit,
    /// Print the tree structure.
    Btree,
    /// Print the layout constants.
    Constants,
    /// Print pager counters.
    Stats,
    /// Check the tree structure.
    Verify,
}

impl MetaCommand {
    /// Parses a line starting with `.`; `None` for unknown commands.
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            ".exit" => Some(Self::Exit),
            ".btree" => Some(Self::Btree),
            ".constants" => Some(Self::Constants),
            ".stats" => Some(Self::Stats),
            ".verify" => Some(Self::Verify),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands_parse() {
        assert_eq!(MetaCommand::parse(".exit"), Some(MetaCommand::Exit));
        assert_eq!(MetaCommand::parse(".btree"), Some(MetaCommand::Btree));
        assert_eq!(MetaCommand::parse(".constants"), Some(MetaCommand::Constants));
        assert_eq!(MetaCommand::parse(".stats"), Some(MetaCommand::Stats));
        assert_eq!(MetaCommand::parse(".verify"), Some(MetaCommand::Verify));
    }

    #[test]
    fn unknown_or_padded_commands_do_not() {
        assert_eq!(MetaCommand::parse(".foo"), None);
        assert_eq!(MetaCommand::parse(".exit "), None);
    }
}
