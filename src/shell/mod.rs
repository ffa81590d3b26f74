pub mod help;

use crate::config::Config;
use crate::dispatch;
use crate::error::AppError;
use crate::install::{self, pkg};
use crate::install::pkg::PkgManager;
use crate::registry::discovery::{ModuleEntry, ModuleRegistry};
use crate::registry::LaunchMode;
use crate::sessions::{SessionManager, SessionView};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

const BANNER: &str = r#"
    ╔══════════════════════════════════════════════╗
    ║              s e c f r a m e                 ║
    ╠══════════════════════════════════════════════╣
    ║  help      show available commands           ║
    ║  list      show available tools              ║
    ║  sessions  manage running sessions           ║
    ╚══════════════════════════════════════════════╝
"#;

#[derive(Debug, Clone, Copy)]
enum PkgAction {
    Install,
    Update,
    Remove,
}

impl PkgAction {
    fn name(&self) -> &'static str {
        match self {
            PkgAction::Install => "install",
            PkgAction::Update => "update",
            PkgAction::Remove => "remove",
        }
    }
}

/// Interactive command loop tying the registry, the installer and the
/// session core together.
pub struct Shell {
    config: Config,
    registry: ModuleRegistry,
    sessions: SessionManager,
    editor: DefaultEditor,
}

impl Shell {
    pub fn new(
        config: Config,
        registry: ModuleRegistry,
        sessions: SessionManager,
    ) -> Result<Self, AppError> {
        Ok(Self {
            config,
            registry,
            sessions,
            editor: DefaultEditor::new()?,
        })
    }

    pub async fn run(&mut self) -> Result<(), AppError> {
        println!("{}", BANNER.cyan());

        loop {
            let prompt = format!("{} ", "secframe ≫".cyan().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);
                    if self.handle_line(&line).await {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "[!] Use 'exit' to leave the framework".yellow());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{} {}", "[!]".red(), e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns true when the loop should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (command, args) = (tokens[0], &tokens[1..]);
        debug!(%command, "Handling command");

        match command {
            "exit" | "quit" => return self.cmd_exit(),
            "help" => self.cmd_help(args),
            "clear" => {
                print!("\x1b[2J\x1b[H");
                println!("{}", BANNER.cyan());
            }
            "list" => self.cmd_list(args).await,
            "install" => self.cmd_pkg(PkgAction::Install, args).await,
            "update" => self.cmd_pkg(PkgAction::Update, args).await,
            "remove" => self.cmd_pkg(PkgAction::Remove, args).await,
            "use" => self.cmd_use(args).await,
            "sessions" => self.cmd_sessions(args).await,
            "kill" => self.cmd_kill(args).await,
            "show" => self.cmd_show(args),
            "search" => self.cmd_search(args),
            "terminal" => self.cmd_terminal().await,
            _ => {
                println!("{} Unknown command: {}", "[!]".red(), command);
                println!("{} Use 'help' to see available commands", "[*]".cyan());
            }
        }
        false
    }

    fn cmd_exit(&mut self) -> bool {
        if !self.sessions.is_empty() {
            println!(
                "\n{}",
                "[!] There are tracked sessions. Exit anyway? (y/N)".yellow()
            );
            match self.editor.readline("") {
                Ok(answer) if answer.trim().eq_ignore_ascii_case("y") => {}
                _ => return false,
            }
        }
        println!("\n{}", "[*] Stay curious, stay legal.".cyan());
        true
    }

    fn cmd_help(&self, args: &[&str]) {
        match args.first() {
            None => help::framework_help(),
            Some(&"tmux") => help::tmux_help(),
            Some(topic) => {
                if let Some(entry) = self.registry.get(topic) {
                    help::module_help(&entry.module().help());
                } else if !help::command_help(&topic.to_lowercase()) {
                    println!("{} No help for '{}'", "[!]".red(), topic);
                }
            }
        }
    }

    async fn cmd_list(&mut self, args: &[&str]) {
        match args.first() {
            Some(&"sessions") => match self.sessions.list_sessions().await {
                Ok(views) => render_sessions(&views),
                Err(e) => print_error(&e),
            },
            _ => self.render_tools(),
        }
    }

    fn render_tools(&self) {
        if self.registry.is_empty() {
            println!("{}", "[!] No tools registered".yellow());
            return;
        }
        println!("\n{}", "[*] Available tools:".cyan());
        for entry in self.registry.entries() {
            render_tool_entry(entry);
        }
    }

    async fn cmd_pkg(&mut self, action: PkgAction, args: &[&str]) {
        let Some(name) = args.first() else {
            println!("{} You must specify a tool name", "[!]".red());
            return;
        };
        let Some(entry) = self.registry.get(name) else {
            println!("{} Tool '{}' not found", "[!]".red(), name);
            return;
        };

        let Some(manager) = PkgManager::detect(self.config.pkg_manager_override.as_deref()) else {
            print_error(&AppError::PkgManagerUnavailable);
            return;
        };

        let module = entry.module();
        let commands = match action {
            PkgAction::Install => module.install_commands(manager),
            PkgAction::Update => module.update_commands(manager),
            PkgAction::Remove => module.remove_commands(manager),
        };
        let Some(commands) = commands.filter(|c| !c.is_empty()) else {
            let supported: Vec<&str> = PkgManager::ALL
                .iter()
                .filter(|pm| match action {
                    PkgAction::Install => module.install_commands(**pm).is_some(),
                    PkgAction::Update => module.update_commands(**pm).is_some(),
                    PkgAction::Remove => module.remove_commands(**pm).is_some(),
                })
                .map(|pm| pm.name())
                .collect();
            print_error(&AppError::PkgManagerUnsupported {
                manager: manager.to_string(),
                tool: module.name().to_string(),
                supported: supported.join(", "),
            });
            return;
        };

        println!(
            "{} Running {} for {} via {}",
            "[*]".cyan(),
            action.name(),
            module.name(),
            manager
        );
        if let Err(e) = pkg::run_commands(&commands).await {
            print_error(&e);
            println!("{} {} operation aborted", "[!]".red(), action.name());
            return;
        }

        // The operation changed the system; force a fresh verdict.
        entry.invalidate_installed();
        let installed = install::check(entry);
        match action {
            PkgAction::Install | PkgAction::Update => {
                if installed {
                    println!("{} {} is installed", "[+]".green(), module.name());
                } else {
                    println!(
                        "{} {} does not look installed after the operation",
                        "[!]".yellow(),
                        module.name()
                    );
                }
            }
            PkgAction::Remove => {
                if installed {
                    println!(
                        "{} {} still looks installed",
                        "[!]".yellow(),
                        module.name()
                    );
                } else {
                    println!("{} {} has been removed", "[+]".green(), module.name());
                }
            }
        }
    }

    async fn cmd_use(&mut self, args: &[&str]) {
        match args {
            [] => println!("{} You must specify a tool or 'session <id>'", "[!]".red()),
            ["session", id] => self.attach_session(id).await,
            [name, ..] => self.use_module(name).await,
        }
    }

    async fn attach_session(&mut self, id_str: &str) {
        let Ok(id) = id_str.parse::<u32>() else {
            println!("{} Invalid session id: {}", "[!]".red(), id_str);
            return;
        };
        println!("{} Attaching to session {}", "[*]".cyan(), id);
        println!("{} Use Ctrl+b d to return to the framework", "[*]".cyan());
        match self.sessions.use_session(id).await {
            Ok(()) => println!("\n{} Back in the framework", "[+]".green()),
            Err(e) => print_error(&e),
        }
    }

    async fn use_module(&mut self, name: &str) {
        let Some(entry) = self.registry.get(name) else {
            println!("{} Tool '{}' not found", "[!]".red(), name);
            return;
        };
        if !install::check(entry) {
            println!("{} {} is not installed", "[!]".red(), name);
            println!("{} Install it with: install {}", "[*]".cyan(), name);
            return;
        }
        let entry = entry.clone();

        println!(
            "\n{} Starting {} in a new tmux session",
            "[*]".cyan(),
            entry.module().name()
        );
        let Some(mode) = self.prompt_mode() else {
            return; // cancelled or back to menu; no session was created
        };

        println!("\n{} Remember:", "[*]".cyan());
        println!("  • Use {} to return to the framework", "Ctrl+b d".bold());
        println!("  • Use {} to reattach later", "sessions use <id>".bold());

        match dispatch::launch_module(&mut self.sessions, &entry, mode, &self.config).await {
            Ok(_) => println!("\n{} Back in the framework", "[+]".green()),
            Err(e) => print_error(&e),
        }
    }

    /// Mode selection prompt. Ctrl+C cancels and returns control to the
    /// caller; no logical session exists until a mode is chosen.
    fn prompt_mode(&mut self) -> Option<LaunchMode> {
        println!("\n{}", "Select execution mode:".green());
        println!("{} Guided mode", "1:".green());
        println!("{} Direct mode", "2:".green());
        println!("{} Back to main menu", "3:".green());

        loop {
            match self.editor.readline(&format!("\n{} ", "Select mode (1/2/3):".bold())) {
                Ok(choice) => match choice.trim() {
                    "1" => return Some(LaunchMode::Guided),
                    "2" => return Some(LaunchMode::Direct),
                    "3" => return None,
                    _ => println!("{} Invalid option", "[!]".red()),
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!();
                    return None;
                }
                Err(e) => {
                    eprintln!("{} {}", "[!]".red(), e);
                    return None;
                }
            }
        }
    }

    async fn cmd_sessions(&mut self, args: &[&str]) {
        match args {
            [] | ["list"] => match self.sessions.list_sessions().await {
                Ok(views) => render_sessions(&views),
                Err(e) => print_error(&e),
            },
            ["use", id] => self.attach_session(id).await,
            ["kill", "all"] => self.kill_all().await,
            ["kill", id] => self.kill_one(id).await,
            ["clear"] => match self.sessions.clear_sessions().await {
                Ok(removed) if removed.is_empty() => {
                    println!("{} No inactive sessions to clear", "[+]".green())
                }
                Ok(removed) => {
                    for id in &removed {
                        println!("{} Removed inactive session {}", "[!]".yellow(), id);
                    }
                    println!(
                        "{} Cleared {} inactive session(s)",
                        "[+]".green(),
                        removed.len()
                    );
                }
                Err(e) => print_error(&e),
            },
            _ => {
                println!("\n{}", "Usage of sessions:".cyan());
                println!("  sessions            - List all sessions");
                println!("  sessions use <id>   - Reattach to a session");
                println!("  sessions kill <id>  - Terminate a session");
                println!("  sessions kill all   - Terminate every session");
                println!("  sessions clear      - Drop dead sessions");
            }
        }
    }

    async fn cmd_kill(&mut self, args: &[&str]) {
        match args {
            ["session", id] => self.kill_one(id).await,
            ["all", "sessions"] => self.kill_all().await,
            _ => println!(
                "{} Usage: kill session <id> | kill all sessions",
                "[!]".red()
            ),
        }
    }

    async fn kill_one(&mut self, id_str: &str) {
        let Ok(id) = id_str.parse::<u32>() else {
            println!("{} Invalid session id: {}", "[!]".red(), id_str);
            return;
        };
        match self.sessions.kill_session(id).await {
            Ok(()) => println!("{} Session {} terminated", "[+]".green(), id),
            Err(e) => print_error(&e),
        }
    }

    async fn kill_all(&mut self) {
        if self.sessions.is_empty() {
            println!("{} No sessions to remove", "[!]".yellow());
            return;
        }
        let editor = &mut self.editor;
        let sessions = &mut self.sessions;
        let result = sessions
            .kill_all_sessions(|summary| {
                println!("\n{}", "[!] Every session will be removed:".yellow());
                println!("  - Active sessions:   {}", summary.active);
                println!("  - Inactive sessions: {}", summary.inactive);
                println!("  - Total:             {}", summary.total);
                matches!(
                    editor.readline(&format!(
                        "\n{} ",
                        "Remove all sessions? (y/N):".yellow()
                    )),
                    Ok(answer) if answer.trim().eq_ignore_ascii_case("y")
                )
            })
            .await;
        match result {
            Ok(true) => println!("\n{} All sessions removed", "[+]".green()),
            Ok(false) => println!("\n{} Operation cancelled", "[+]".green()),
            Err(e) => print_error(&e),
        }
    }

    fn cmd_show(&self, args: &[&str]) {
        match args.first() {
            None => println!("{} Usage: show category | show <category>", "[!]".red()),
            Some(&"category") => {
                let cats = self.registry.categories();
                if cats.is_empty() {
                    println!("{} No categories available", "[!]".yellow());
                    return;
                }
                println!("\n{}", "[*] Categories:".cyan());
                for cat in cats {
                    let count = self.registry.entries_in_category(&cat).len();
                    println!("  {} ({} tool{})", cat.bold(), count, if count == 1 { "" } else { "s" });
                }
            }
            Some(category) => {
                let entries = self.registry.entries_in_category(category);
                if entries.is_empty() {
                    println!("{} No tools in category '{}'", "[!]".yellow(), category);
                    return;
                }
                println!("\n{} Tools in {}:", "[*]".cyan(), category.bold());
                for entry in entries {
                    render_tool_entry(entry);
                }
            }
        }
    }

    fn cmd_search(&self, args: &[&str]) {
        let Some(term) = args.first() else {
            println!("{} Usage: search <term>", "[!]".red());
            return;
        };
        let matches = self.registry.search(term);
        if matches.is_empty() {
            println!("{} No tools matching '{}'", "[!]".yellow(), term);
            return;
        }
        println!("\n{} Matches for '{}':", "[*]".cyan(), term);
        for entry in matches {
            render_tool_entry(entry);
        }
    }

    async fn cmd_terminal(&mut self) {
        println!("{} Opening a terminal session", "[*]".cyan());
        match dispatch::launch_terminal(&mut self.sessions, &self.config).await {
            Ok(_) => println!("\n{} Back in the framework", "[+]".green()),
            Err(e) => print_error(&e),
        }
    }
}

fn render_tool_entry(entry: &ModuleEntry) {
    let module = entry.module();
    let status = if install::check(entry) {
        "[✓] Installed".green().to_string()
    } else {
        "[✗] Not installed".red().to_string()
    };
    println!("\n{}:", module.name().bold());
    println!("  Status:      {}", status);
    println!("  Category:    {}", module.category());
    println!("  Description: {}", module.description());
    if !module.command().is_empty() {
        println!("  Command:     {}", module.command());
    }
    let deps = module.dependencies();
    if !deps.is_empty() {
        println!("  Depends on:  {}", deps.join(", "));
    }
}

fn render_sessions(views: &[SessionView]) {
    if views.is_empty() {
        println!("\n{}", "[!] No sessions registered".yellow());
        return;
    }
    if views.iter().all(|v| !v.active) {
        println!("\n{}", "[!] No sessions are active in tmux".yellow());
    }
    println!("\n{}", "[*] Sessions:".cyan());
    for view in views {
        let status = if view.active {
            "ACTIVE".green().to_string()
        } else {
            "INACTIVE".red().to_string()
        };
        println!("\n{}:", format!("Session {}", view.id).bold());
        println!("  Name:     {}", view.label);
        println!("  Status:   {}", status);
        println!("  Started:  {}", view.start_time);
        println!("  Duration: {}", view.duration);
        if let Some(cmd) = &view.last_command {
            println!("  Last command: {}", cmd);
        }
        if view.logging {
            println!("  Logging:  {}", "active".green());
        }
    }
}

fn print_error(err: &AppError) {
    println!("{} {}", "[!]".red(), err);
}
