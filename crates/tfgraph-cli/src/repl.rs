//! REPL – Read-Eval-Print Loop for the `tfgraph` shell.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /frames               – list declared frames
//!   /transforms           – list static, dynamic and example transforms
//!   /joints               – list movable joints
//!   /chain <from> <to>    – shortest transformation chain
//!   /static <from> <to>   – chain over static transforms only
//!   /forbid <a> <b> <from> <to> – chain avoiding any edge between a and b
//!   /load <path>          – import another description
//!   /config [save]        – show or persist the current settings
//!   /quit | /exit         – exit the shell

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tfgraph_core::chain::Chain;
use tfgraph_core::geometry::Pose;
use tfgraph_core::graph::{Transform, TransformLink};
use tfgraph_types::FrameError;

use crate::config;
use crate::session::Session;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Frames,
    Transforms,
    Joints,
    Chain { from: String, to: String },
    StaticChain { from: String, to: String },
    Forbid { a: String, b: String, from: String, to: String },
    Load(String),
    ShowConfig,
    SaveConfig,
    Quit,
}

impl Command {
    /// Parse one input line.  The error is the message to show the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let arity = |n: usize, usage: &str| {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("usage: {usage}"))
            }
        };

        match name {
            "/help" => Ok(Command::Help),
            "/frames" => Ok(Command::Frames),
            "/transforms" => Ok(Command::Transforms),
            "/joints" => Ok(Command::Joints),
            "/chain" => {
                arity(2, "/chain <from> <to>")?;
                Ok(Command::Chain {
                    from: args[0].to_string(),
                    to: args[1].to_string(),
                })
            }
            "/static" => {
                arity(2, "/static <from> <to>")?;
                Ok(Command::StaticChain {
                    from: args[0].to_string(),
                    to: args[1].to_string(),
                })
            }
            "/forbid" => {
                arity(4, "/forbid <a> <b> <from> <to>")?;
                Ok(Command::Forbid {
                    a: args[0].to_string(),
                    b: args[1].to_string(),
                    from: args[2].to_string(),
                    to: args[3].to_string(),
                })
            }
            "/load" => {
                arity(1, "/load <path>")?;
                Ok(Command::Load(args[0].to_string()))
            }
            "/config" => match args.as_slice() {
                [] => Ok(Command::ShowConfig),
                ["save"] => Ok(Command::SaveConfig),
                _ => Err("usage: /config [save]".to_string()),
            },
            "/quit" | "/exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: '{other}'")),
        }
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(session: &mut Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "tfgraph>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(cmd) => execute(session, cmd),
            Err(msg) => println!(
                "{} Type {} for available commands.",
                msg.red(),
                "/help".bold()
            ),
        }
    }
}

fn execute(session: &mut Session, cmd: Command) {
    match cmd {
        Command::Help => cmd_help(),
        Command::Frames => cmd_frames(session),
        Command::Transforms => cmd_transforms(session),
        Command::Joints => cmd_joints(session),
        Command::Chain { from, to } => print_chain(session.chain(&from, &to)),
        Command::StaticChain { from, to } => print_chain(session.static_chain(&from, &to)),
        Command::Forbid { a, b, from, to } => {
            print_chain(session.chain_avoiding(&from, &to, &a, &b))
        }
        Command::Load(path) => cmd_load(session, Path::new(&path)),
        Command::ShowConfig => cmd_show_config(session),
        Command::SaveConfig => match config::save(&session.config) {
            Ok(()) => println!(
                "{} {}",
                "✓ Settings saved to".green(),
                config::config_path().display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        },
        Command::Quit => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "tfgraph Commands".bold().underline());
    println!("  {}                 – list declared frames", "/frames".bold().cyan());
    println!("  {}             – list transforms", "/transforms".bold().cyan());
    println!("  {}                 – list movable joints", "/joints".bold().cyan());
    println!("  {}      – shortest transformation chain", "/chain <from> <to>".bold().cyan());
    println!("  {}     – chain over static transforms only", "/static <from> <to>".bold().cyan());
    println!("  {} – chain avoiding edge a-b", "/forbid <a> <b> <from> <to>".bold().cyan());
    println!("  {}           – import another description", "/load <path>".bold().cyan());
    println!("  {}        – show or save settings", "/config [save]".bold().cyan());
    println!("  {}          – exit the shell", "/quit  /exit".bold().cyan());
    println!();
}

pub(crate) fn cmd_load(session: &mut Session, path: &Path) {
    match session.load(path) {
        Ok(summary) => println!(
            "  {} {} – {} model(s), {} link(s), {} joint(s) ({} movable, {} bound), {} frame(s)",
            "✓ Loaded".green(),
            path.display().to_string().bold(),
            summary.models,
            summary.links,
            summary.joints,
            summary.movable_joints,
            summary.dynamic_bindings,
            session.graph().frame_count()
        ),
        Err(e) => println!("{}: {}", "Load error".red(), e),
    }
}

fn cmd_frames(session: &Session) {
    let graph = session.graph();
    if graph.frame_count() == 0 {
        println!("  {}", "No frames. Use /load <path> first.".dimmed());
        return;
    }
    for frame in graph.frames() {
        println!("  {frame}");
    }
}

fn cmd_transforms(session: &Session) {
    let graph = session.graph();
    let all = graph
        .transforms()
        .chain(graph.example_transforms())
        .collect::<Vec<_>>();
    if all.is_empty() {
        println!("  {}", "No transforms.".dimmed());
        return;
    }
    for t in all {
        println!("  {}", describe_transform(t));
    }
}

fn cmd_joints(session: &Session) {
    let mut any = false;
    for ((post, pre), joint) in session.graph().joints() {
        any = true;
        println!(
            "  {} {} [{}, {}]  {} => {}",
            joint.name.bold(),
            joint.joint_type.to_string().yellow(),
            joint.lower,
            joint.upper,
            post,
            pre
        );
    }
    if !any {
        println!("  {}", "No movable joints.".dimmed());
    }
}

fn cmd_show_config(session: &Session) {
    let cfg = &session.config;
    println!("{}", "Settings".bold().underline());
    println!(
        "  model_path     : {}",
        cfg.model_path.as_deref().unwrap_or("<none>").yellow()
    );
    println!("  exclude_models : {}", cfg.exclude_models.join(", ").yellow());
    println!("  resolve_joints : {}", cfg.resolve_joints.to_string().yellow());
    if let Some(source) = session.source() {
        println!("  loaded from    : {}", source.display());
    }
}

fn print_chain(result: Result<Chain, FrameError>) {
    let chain = match result {
        Ok(chain) => chain,
        Err(e) => {
            println!("{}", e.to_string().red());
            return;
        }
    };
    if chain.is_empty() {
        println!("  {} and {} are the same frame", chain.from(), chain.to());
        return;
    }
    for link in chain.links() {
        println!("  {}", describe_link(link));
    }
    match chain.pose() {
        Some(pose) => println!("  {} {}", "pose:".bold(), format_pose(&pose)),
        None => {
            let partition = chain.partition();
            let producers: Vec<String> =
                partition.producers().iter().map(|p| p.to_string()).collect();
            println!("  {} {}", "needs:".bold(), producers.join(", ").yellow());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────────────────────────────────────

fn describe_transform(t: &Transform) -> String {
    let value = match (t.pose(), t.producer()) {
        (Some(pose), _) => format_pose(pose),
        (None, Some(producer)) => format!("<{producer}>"),
        (None, None) => String::new(),
    };
    format!("{:<8} {} => {}  {}", t.kind().to_string(), t.from(), t.to(), value)
}

fn describe_link(link: &TransformLink) -> String {
    let arrow = if link.inverted { "<=" } else { "=>" };
    let value = match (link.pose(), link.producer()) {
        (Some(pose), _) => format_pose(&pose),
        (None, Some(producer)) => format!("<{producer}>"),
        (None, None) => String::new(),
    };
    format!(
        "{:<8} {} {} {}  {}",
        link.kind().to_string(),
        link.from(),
        arrow,
        link.to(),
        value
    )
}

pub(crate) fn format_pose(pose: &Pose) -> String {
    let t = pose.translation;
    let q = pose.rotation;
    format!(
        "t=({:.3}, {:.3}, {:.3}) q=({:.3}, {:.3}, {:.3}, {:.3})",
        t.x, t.y, t.z, q.w, q.x, q.y, q.z
    )
}
