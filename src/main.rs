use std::process;

use rowan_chess::uci::uci_top::run_stdio_loop;

fn main() {
    if let Err(err) = run_stdio_loop() {
        eprintln!("fatal I/O error in UCI loop: {err}");
        process::exit(1);
    }
}
