//! Running one request and showing its result

use colored::Colorize;

use crate::error::Result;
use crate::prompt::SecretSource;
use crate::protocol::{CommandSession, Reply, Request};
use crate::transport::Link;

const RESET_WARNING: &str = "Factory reset erases every secret on the token. Continue?";

/// Execute `request` on `session` and print what came back
///
/// A factory reset goes ahead only if `confirm` agrees.
pub fn run<L: Link>(
    session: &mut CommandSession<L>,
    request: Request,
    source: &mut dyn SecretSource,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<()> {
    if request == Request::Reset && !confirm(RESET_WARNING) {
        println!("Cancelled.");
        return Ok(());
    }

    let reply = session.execute(request, source)?;
    print_reply(reply);
    Ok(())
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Greeting(greeting) => println!("{}", greeting),
        Reply::SecretStored { status } => {
            if let Some(status) = status {
                println!("{}", status);
            }
            println!("{}", "Secret stored.".green());
        }
        Reply::Secret(secret) => {
            // Shown once, then wiped when `secret` drops
            println!("{}", secret.to_string_lossy());
        }
        Reply::Tags { header, listing } => {
            println!("{}", header);
            println!("{}", listing.trim_end());
        }
        Reply::ResetDone(confirmation) => println!("{}", confirmation),
        Reply::DeviceKeySet | Reply::TotpStored => println!("{}", "Secret sent.".green()),
        Reply::ClockSynced {
            epoch,
            confirmation,
        } => {
            println!("{}", confirmation);
            println!("{} {}", "Clock set to".dimmed(), epoch.to_string().dimmed());
        }
    }
}
