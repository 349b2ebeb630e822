use colored::*;
use console::Term;
use std::fmt::Display;

/// Terminal output with the game's colors and symbols.
/// All methods are static; this is just a namespace.
/// Blue (14, 173, 221) for info, gold (240, 180, 30) for the brand.
pub struct Logger;

impl Logger {
    /// Prints the banner, centered on the terminal.
    pub fn banner() {
        let term = Term::stdout();
        let width = term.size().1 as usize;

        let banner = r#"
  _                                        
 | |_ __ _ _ __   __ _  __ _ _ __ ___   ___ 
 | __/ _` | '_ \ / _` |/ _` | '_ ` _ \ / _ \
 | || (_| | |_) | (_| | (_| | | | | | |  __/
  \__\__,_| .__/ \__, |\__,_|_| |_| |_|\___|
          |_|    |___/                      
"#;

        for line in banner.lines() {
            if line.trim().is_empty() {
                continue;
            }
            println!(
                "{:^width$}",
                line.truecolor(240, 180, 30).bold().to_string(),
                width = width
            );
        }
        println!();
    }

    /// Prints an info message with a blue bullet point.
    pub fn info<T: Display>(msg: T) {
        println!("{} {}", "•".truecolor(14, 173, 221).bold(), msg);
    }

    /// Prints a success message with a green checkmark.
    pub fn success<T: Display>(msg: T) {
        println!("{} {}", "✔".green().bold(), msg);
    }

    /// Prints an error message with a red X.
    pub fn error<T: Display>(msg: T) {
        println!("{} {}", "✖".red().bold(), msg);
    }

    /// Prints a warning with a yellow warning symbol. Reserved for things the
    /// player should act on, like taps that never reached the server.
    pub fn warn<T: Display>(msg: T) {
        println!("{} {}", "⚠".yellow().bold(), msg);
    }

    /// The terminal's stand-in for the "success" haptic: a loud line on level up.
    pub fn level_up(level: i32) {
        println!(
            "{} {}",
            "★".truecolor(240, 180, 30).bold(),
            format!("Level up! Welcome to level {}", level)
                .truecolor(240, 180, 30)
                .bold()
        );
    }

    /// Returns a string colored in brand blue (for inline use).
    pub fn highlight<T: Display>(msg: T) -> String {
        msg.to_string().truecolor(14, 173, 221).bold().to_string()
    }

    /// Returns a dimmed string (less important text).
    pub fn dim<T: Display>(msg: T) -> String {
        msg.to_string().dimmed().to_string()
    }
}
