use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use moc_mpris::{
    Bridge, BridgeOptions, ConnectionTarget, Interface, NoArt, SystemTransport, Value,
};

const VALUE_INDENTATION: usize = 25;

fn main() {
    match print_properties() {
        Ok(_) => {}
        Err(error) => {
            print!("{}", describe(&error));
            std::process::exit(1);
        }
    }
}

/// Print what the bridge would serve for the player given as first argument (or the local one),
/// without touching the bus.
fn print_properties() -> Result<()> {
    let target = parse_target(std::env::args().nth(1).as_deref())?;

    let transport = SystemTransport::new(target.clone(), Duration::from_secs(5));
    let mut bridge = Bridge::new(
        target,
        BridgeOptions::default(),
        Box::new(transport),
        Box::new(NoArt),
    );
    bridge
        .connect(SystemTime::now())
        .context("Could not reach the player")?;

    for interface in [Interface::Root, Interface::Player] {
        println!();
        println!("\t─── {} ───", interface);
        for (name, value) in bridge
            .get_all(interface)
            .with_context(|| format!("Could not read the {} properties", interface))?
        {
            print_value(name, &value);
        }
    }

    Ok(())
}

fn parse_target(token: Option<&str>) -> Result<ConnectionTarget> {
    match token {
        Some(token) => token
            .parse::<ConnectionTarget>()
            .with_context(|| format!("Invalid player address {:?}", token)),
        None => Ok(ConnectionTarget::local()),
    }
}

fn describe(error: &anyhow::Error) -> String {
    let mut text = format!("Error: {}\n", error);
    for (i, cause) in error.chain().skip(1).enumerate() {
        text.push_str(&"  ".repeat(i + 1));
        text.push_str(&format!("Caused by: {}\n", cause));
    }
    text
}

fn print_value(name: &str, value: &Value) {
    match value {
        Value::Map(map) => {
            println!("{:>indent$}:", name, indent = VALUE_INDENTATION);
            for (key, value) in map {
                println!("{:>indent$}  {} = {:?}", "", key, value, indent = VALUE_INDENTATION);
            }
        }
        other => println!("{:>indent$}: {:?}", name, other, indent = VALUE_INDENTATION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_defaults_to_the_local_player() {
        assert_eq!(parse_target(None).unwrap(), ConnectionTarget::local());
    }

    #[test]
    fn it_describes_every_cause_of_an_error() {
        let error = parse_target(Some("a@b@c")).unwrap_err();
        assert_eq!(
            describe(&error),
            "Error: Invalid player address \"a@b@c\"\n  \
             Caused by: remote target \"a@b@c\" must be of the form user@host or host\n"
        );
    }
}
