/// Command palette entries and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "home",
    aliases: &["h", "main"],
    description: "Start page",
  },
  Command {
    name: "keys",
    aliases: &["k", "key", "mykeys"],
    description: "Your license keys",
  },
  Command {
    name: "invites",
    aliases: &["i", "invite"],
    description: "Your invite codes",
  },
  Command {
    name: "discord",
    aliases: &["d", "link"],
    description: "Discord account link",
  },
  Command {
    name: "users",
    aliases: &["u", "user", "admin"],
    description: "Manage users (staff)",
  },
  Command {
    name: "allkeys",
    aliases: &["ak", "all", "keysadmin"],
    description: "Manage every key (admin)",
  },
  Command {
    name: "password",
    aliases: &["pw", "passwd"],
    description: "Change your password",
  },
  Command {
    name: "errors",
    aliases: &["err", "log"],
    description: "Recent errors",
  },
  Command {
    name: "theme",
    aliases: &["t"],
    description: "Toggle dark/light theme",
  },
  Command {
    name: "lang",
    aliases: &["language", "l"],
    description: "Cycle interface language",
  },
  Command {
    name: "login",
    aliases: &["signin"],
    description: "Sign in",
  },
  Command {
    name: "register",
    aliases: &["signup"],
    description: "Create an account",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Sign out",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit keydeck",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("invites");
    assert_eq!(suggestions[0].name, "invites");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("ak")[0].name, "allkeys");
    assert_eq!(get_suggestions("q")[0].name, "quit");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("disc")[0].name, "discord");
    assert_eq!(get_suggestions("pass")[0].name, "password");
  }

  #[test]
  fn test_exact_name_beats_alias_prefix() {
    // "keys" is a name, and a substring of "allkeys"
    let suggestions = get_suggestions("keys");
    assert_eq!(suggestions[0].name, "keys");
    assert!(suggestions.iter().any(|c| c.name == "allkeys"));
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("cord");
    assert_eq!(suggestions[0].name, "discord");
  }

  #[test]
  fn test_every_command_is_handled() {
    for cmd in COMMANDS {
      let routed = crate::routes::Route::from_command(cmd.name).is_some();
      let action = matches!(cmd.name, "theme" | "lang" | "logout" | "quit");
      assert!(routed || action, "{} has no handler", cmd.name);
    }
  }
}
