use clap::Parser;
use log::info;

use codec::MessageId;
use session::Capabilities;
use v150_relay::{Cli, Gateway, TuningConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    let tuning = TuningConfig::load(cli.config.as_ref())?;

    let near = Capabilities {
        support: session::capability::SUPPORT_I_CHAR_STAT
            | session::capability::SUPPORT_I_CHAR_DYN_CS
            | session::capability::SUPPORT_I_OCTET_CS,
        ..Capabilities::default()
    };
    let info_priority = vec![
        MessageId::ICharDynCs,
        MessageId::ICharStat,
        MessageId::IOctetCs,
        MessageId::IOctet,
        MessageId::IRawOctet,
    ];

    let mut gateway = Gateway::bind(
        cli.bind,
        cli.peer,
        cli.subsession,
        cli.payload_type,
        tuning.channel_params(),
        tuning.sse_reliability(),
        near,
        info_priority,
    )?;

    info!("bound {}, peer {}; sending INIT", cli.bind, cli.peer);
    gateway.send_init()?;

    loop {
        gateway.poll_once()?;
    }
}
