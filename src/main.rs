// src/main.rs

// rat_calc
// A keypad calculator over floats and exact rationals, driven from the terminal.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use tracing::{error, info};

use rat_calc::units::{self, Registry};
use rat_calc::{
    logging, Action, Calculator, Mode, Rational, Render, Session, Undoable, UserError, Value,
};

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Where the calculator state is saved between runs.
    #[arg(long, default_value = "rat_calc.json")]
    state: PathBuf,

    /// Never read or write the state file.
    #[arg(long)]
    no_persist: bool,

    /// Ignore any saved state and start from an empty calculator.
    #[arg(long)]
    fresh: bool,

    /// Initial display mode (decimal or frac).
    #[arg(long)]
    mode: Option<Mode>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Renders the latest snapshot into a buffer the REPL prints once per line.
#[derive(Default)]
struct Terminal {
    frame: String,
}

impl Render for Terminal {
    fn render(&mut self, state: &Undoable<Calculator>, error: Option<&UserError>) {
        let mut frame = String::new();
        let stack = state.rendered_stack();
        for (i, value) in stack.iter().enumerate() {
            let _ = writeln!(frame, "{:>3}: {}", stack.len() - i, value);
        }
        if !state.is_empty() {
            let _ = writeln!(frame, "  > {}", state.display());
        }
        if let Some(e) = error {
            let _ = writeln!(frame, "  ! {}", e);
        }
        self.frame = frame;
    }
}

fn show_help() {
    println!("\n--- rat_calc ---\n");
    let lines = [
        ("4.5  3/4  2_1/8", "numbers: decimal, fraction, mixed (whole_num/denom)"),
        ("'name", "a word; pushes its value if bound"),
        ("=", "store: binds the value under the word on top"),
        ("add sub mul div ...", "any operator name"),
        ("swap | exch A B", "swap the top two | swap slots A and B (negative counts from the top)"),
        ("undo | redo", "step through history"),
        ("clear | reset", "drop the typed token | start over"),
        ("show decimal|frac", "display mode"),
        (":ops", "operators valid for the current stack"),
        (":units [N] FROM TO..", "convert N (or the top value) from one unit into others"),
    ];
    for (input, meaning) in lines.iter() {
        println!("  {:<22} {}", input, meaning);
    }
    println!();
}

/// Turns one input token into keystroke actions. A leading `'` marks a word.
fn keystrokes(token: &str) -> Vec<Action> {
    let keys = token.strip_prefix('\'').unwrap_or(token);
    let mut actions: Vec<Action> = keys
        .chars()
        .map(|ch| match ch {
            '0'..='9' => Action::Digit(ch as u8 - b'0'),
            '.' => Action::Decimal,
            '_' => Action::Num,
            '/' => Action::Denom,
            other => Action::Letter(other),
        })
        .collect();
    actions.push(Action::Enter);
    actions
}

fn is_literal(token: &str) -> bool {
    token.starts_with('\'') || token.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

fn parse_index(token: Option<&str>) -> Result<isize, String> {
    let token = token.ok_or("exch needs two indices")?;
    token.parse().map_err(|_| format!("'{}' is not a stack index", token))
}

fn is_amount(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-')
}

/// `:units [amount] <from> <to>...`. Without an amount the top of the stack is converted.
fn convert_units(args: &[&str], calc: &Calculator, registry: &Registry) -> Result<String, String> {
    const USAGE: &str = "usage: :units [amount] <from> <to>...";
    let (amount, names) = match args {
        [first, rest @ ..] if is_amount(first) => {
            (first.parse::<Rational>().map_err(|e| e.to_string())?, rest)
        }
        _ => {
            let amount = match calc.top().map_err(|e| e.to_string())? {
                Value::Rat(r) => r.clone(),
                Value::Float(x) => Rational::from_float(*x).map_err(|e| e.to_string())?,
                Value::Word(w) => return Err(format!("'{}' is not a number", w)),
            };
            (amount, args)
        }
    };
    match names {
        [from, to @ ..] if !to.is_empty() => {
            units::convert(registry, amount, from, to).map_err(|e| e.to_string())
        }
        _ => Err(USAGE.to_string()),
    }
}

/// Feeds one line of input into the session. Stops at the first rejected action.
fn process_line<R: Render>(line: &str, session: &mut Session<R>) -> Result<(), String> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        let actions = match token {
            "undo" => vec![Action::Undo],
            "redo" => vec![Action::Redo],
            "clear" => vec![Action::Clear],
            "reset" => vec![Action::Reset],
            "=" => vec![Action::Store],
            "swap" => vec![Action::Exch(-1, -2)],
            "exch" => {
                let a = parse_index(tokens.next())?;
                let b = parse_index(tokens.next())?;
                vec![Action::Exch(a, b)]
            }
            "show" => {
                let mode = tokens.next().ok_or("show needs a mode")?;
                vec![Action::Show(mode.parse()?)]
            }
            literal if is_literal(literal) => keystrokes(literal),
            name => vec![Action::Operator(name.to_string())],
        };
        if session.dispatch_all(actions).is_err() {
            break;
        }
    }
    Ok(())
}

fn repl(mut session: Session<Terminal>) -> io::Result<()> {
    println!("rat_calc REPL");
    println!("Enter numbers and operators, ':help', or 'quit'");

    let registry = Registry::customary();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }
        if input == ":help" {
            show_help();
            continue;
        }
        if input == ":ops" {
            let names: Vec<&str> = session.calc().valid().iter().map(|op| op.name()).collect();
            println!("{}", names.join(" "));
            continue;
        }

        if let Some(rest) = input.strip_prefix(":units") {
            let args: Vec<&str> = rest.split_whitespace().collect();
            match convert_units(&args, session.calc(), &registry) {
                Ok(text) => println!("{}", text),
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        match process_line(input, &mut session) {
            Ok(()) => print!("{}", session.renderer().frame),
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let session = match (cli.no_persist, cli.fresh) {
        (true, _) => Session::new(Terminal::default()),
        (false, true) => Session::fresh(cli.state.clone(), Terminal::default()),
        (false, false) => Session::load(cli.state.clone(), Terminal::default()),
    };
    let session = match cli.mode {
        Some(mode) => session.with_mode(mode),
        None => session,
    };
    info!(
        persist = session.path().is_some(),
        showing = ?session.calc().showing(),
        "session started"
    );

    if let Err(e) = repl(session) {
        error!(error = %e, "terminal I/O failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
