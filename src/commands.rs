/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "notes",
    aliases: &["n", "list", "dashboard"],
    description: "Back to your notes",
  },
  Command {
    name: "new",
    aliases: &["create", "add"],
    description: "Write a new note",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload the current view",
  },
  Command {
    name: "signout",
    aliases: &["logout", "sign-out"],
    description: "End the session and exit",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit notebook",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input_lower).map(|rank| (cmd, rank)))
    .collect();

  // Stable sort keeps table order within a rank
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better: exact name, exact alias, name prefix, alias prefix,
/// name substring, alias substring
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn first(input: &str) -> Option<&'static str> {
    get_suggestions(input).first().map(|c| c.name)
  }

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(first("new"), Some("new"));
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "n" is an alias of notes and a prefix of new
    let names: Vec<&str> = get_suggestions("n").iter().map(|c| c.name).collect();
    assert_eq!(names[0], "notes");
    assert!(names.contains(&"new"));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(first("ref"), Some("refresh"));
    assert_eq!(first("sign"), Some("signout"));
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(first("out"), Some("signout"));
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("xyz").is_empty());
  }
}
