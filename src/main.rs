//! Entry point: argument parsing and mode dispatch (spec §4.H "Shell
//! driver"). Mirrors the handful of invocation modes bash itself
//! supports rather than trying to cover every historical flag.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "den", version, about = "Den - an interactive bash/zsh-compatible command shell")]
struct Cli {
    /// Run COMMAND instead of reading from a script or stdin.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Force interactive mode.
    #[arg(short = 'i')]
    interactive: bool,

    /// Act as a login shell (sources the same rc file either way here).
    #[arg(short = 'l', long = "login")]
    login: bool,

    /// Skip sourcing the rc file.
    #[arg(long = "norc")]
    norc: bool,

    /// Use an alternate rc file instead of ~/.denrc.
    #[arg(long = "rcfile", value_name = "PATH")]
    rcfile: Option<std::path::PathBuf>,

    /// Script to run, followed by its positional parameters.
    #[arg(trailing_var_arg = true)]
    script_and_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let _ = cli.login;

    let has_script = cli.command.is_none() && !cli.script_and_args.is_empty();
    let interactive = cli.interactive || (cli.command.is_none() && !has_script && is_stdin_tty());

    let mut shell = den::shell::Shell::new(interactive);
    shell.source_rc(cli.rcfile.as_deref(), cli.norc);

    let code = if let Some(command) = cli.command {
        shell.run_command_string(&command, cli.script_and_args)
    } else if has_script {
        let script = std::path::PathBuf::from(&cli.script_and_args[0]);
        let args = cli.script_and_args[1..].to_vec();
        shell.run_script_file(&script, args)
    } else {
        shell.run_interactive()
    };

    std::process::exit(code);
}

fn is_stdin_tty() -> bool {
    unsafe { libc::isatty(0) == 1 }
}
