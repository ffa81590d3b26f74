use crate::registry::HelpInfo;
use colored::Colorize;

fn print_header(text: &str) {
    let bar = "─".repeat(text.len() + 2);
    println!("\n{}", format!("╭{}╮", bar).cyan());
    println!("{} {} {}", "│".cyan(), text.bold(), "│".cyan());
    println!("{}\n", format!("╰{}╯", bar).cyan());
}

fn print_section(title: &str) {
    println!("\n{}", format!("▓▒░ {} ░▒▓", title).green());
}

fn print_command(cmd: &str, desc: &str) {
    println!("  {:<18} {}", cmd.bold(), desc);
}

fn print_option(opt: &str, desc: &str) {
    println!("  {:<18} {}", opt.cyan(), desc);
}

/// Top-level help panel.
pub fn framework_help() {
    print_header("secframe help");

    print_section("Tool management");
    print_command("list [tools]", "List available tools and their status");
    print_command("install <name>", "Install a tool");
    print_command("update <name>", "Update a tool");
    print_command("remove <name>", "Uninstall a tool");
    print_command("show category", "List tool categories");
    print_command("show <category>", "List tools in a category");
    print_command("search <term>", "Search tools by name or description");

    print_section("Running tools");
    print_command("use <name>", "Launch a tool in a new tmux session");
    print_command("use session <id>", "Reattach to a session");
    print_command("sessions", "Manage active sessions");
    print_command("terminal", "Open a plain shell session");

    print_section("System");
    print_command("clear", "Clear the screen");
    print_command("exit", "Leave the framework");
    print_command("help", "Show this panel");

    println!(
        "\n{} Use '{}' for details on one command",
        "▶".cyan(),
        "help <command>".bold()
    );
    println!(
        "{} Use '{}' for the tmux quick reference",
        "▶".cyan(),
        "help tmux".bold()
    );
}

/// Per-module help rendered from its structured payload.
pub fn module_help(info: &HelpInfo) {
    print_header(&info.title);
    println!("{} {}", "Usage:".cyan(), info.usage);
    println!("\n{}", info.desc);

    if !info.modes.is_empty() {
        print_section("Modes");
        for (mode, desc) in &info.modes {
            print_option(mode, desc);
        }
    }
    if !info.options.is_empty() {
        print_section("Options");
        for (opt, desc) in &info.options {
            print_option(opt, desc);
        }
    }
    if !info.examples.is_empty() {
        print_section("Examples");
        for example in &info.examples {
            println!("  {} {}", "▶".green(), example);
        }
    }
    if !info.notes.is_empty() {
        print_section("Notes");
        for note in &info.notes {
            println!("  • {}", note);
        }
    }
}

/// tmux quick reference for users inside a tool session.
pub fn tmux_help() {
    println!("\n{}", "[*] Useful tmux commands:".cyan());
    println!("  • Ctrl+b d          - Detach from the current session (back to the framework)");
    println!("  • Ctrl+b c          - Create a new window");
    println!("  • Ctrl+b n / p      - Next / previous window");
    println!("  • Ctrl+b [0-9]      - Jump to a window by number");
    println!("  • Ctrl+b %          - Split vertically");
    println!("  • Ctrl+b \"          - Split horizontally");
    println!("\n{}", "[*] From the framework:".cyan());
    println!("  • sessions          - List all sessions");
    println!("  • sessions use <id> - Reattach to a session");
    println!("  • sessions kill <id> - Terminate a session");
}

/// Help for one framework command; falls back to the full panel.
pub fn command_help(command: &str) -> bool {
    match command {
        "install" | "update" | "remove" => {
            print_header("Tool installation");
            println!("{} {} <name>", "Usage:".cyan(), command);
            println!("\nRuns the tool's package commands for the detected package manager.");
            println!("Commands run sequentially; the first failure aborts the rest.");
            true
        }
        "use" => {
            print_header("Running tools");
            println!("{} use <name> | use session <id>", "Usage:".cyan());
            println!("\nLaunches a tool in guided or direct mode inside a new tmux session,");
            println!("or reattaches to an existing session by id.");
            true
        }
        "sessions" => {
            print_header("Session management");
            println!("{} sessions [list|use <id>|kill <id>|kill all|clear]", "Usage:".cyan());
            print_section("Subcommands");
            print_option("list", "List all tracked sessions");
            print_option("use <id>", "Reattach to a session");
            print_option("kill <id>", "Terminate a session");
            print_option("kill all", "Terminate every session (asks first)");
            print_option("clear", "Drop sessions that are no longer alive");
            true
        }
        "list" => {
            print_header("Listings");
            println!("{} list [tools|sessions]", "Usage:".cyan());
            true
        }
        "search" => {
            print_header("Search");
            println!("{} search <term>", "Usage:".cyan());
            println!("\nCase-insensitive match over tool names and descriptions.");
            true
        }
        "show" => {
            print_header("Categories");
            println!("{} show category | show <category>", "Usage:".cyan());
            true
        }
        "terminal" => {
            print_header("Terminal");
            println!("{} terminal", "Usage:".cyan());
            println!("\nOpens a plain interactive shell in a managed tmux session.");
            true
        }
        _ => false,
    }
}
