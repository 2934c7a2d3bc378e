//! `wifictl next-channel`: run the DFS sieve for one radio of a
//! snapshot without starting an engine.

use std::str::FromStr;

use serde::Serialize;

use wifictl_core::policy::radar_next_channel;
use wifictl_core::{Channel, ChannelWidth, CoreError, LiveSnapshot};

use crate::cli::{GlobalOpts, NextChannelArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Selection {
    radio: String,
    operating: Option<Channel>,
    radar_enabled: bool,
    next: Option<Channel>,
}

pub fn handle(args: &NextChannelArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot: LiveSnapshot = util::read_input(&args.state)?;
    let radio = snapshot
        .radios
        .iter()
        .find(|r| r.name == args.radio)
        .ok_or_else(|| CoreError::RadioNotFound {
            name: args.radio.clone(),
        })?;

    let width = args
        .width
        .as_deref()
        .map(|raw| {
            ChannelWidth::from_str(raw).map_err(|_| CliError::Validation {
                field: "width".into(),
                reason: format!("unknown channel width '{raw}'"),
            })
        })
        .transpose()?;
    let configured = width
        .zip(radio.channel)
        .map(|(width, operating)| Channel { width, ..operating });

    let selection = Selection {
        radio: radio.name.clone(),
        operating: radio.channel,
        radar_enabled: radio.radar.enabled,
        next: radar_next_channel::select(radio, configured),
    };
    tracing::debug!(radio = %selection.radio, next = ?selection.next, "sieve done");

    let rendered = output::render(global.output, &selection, |s| match (&s.next, s.radar_enabled) {
        (Some(next), _) => format!(
            "{}: {} -> {}",
            s.radio,
            util::channel_label(s.operating.as_ref()),
            util::channel_label(Some(next)),
        ),
        (None, false) => format!("{}: radar detection is off", s.radio),
        (None, true) => format!(
            "{}: no escape channel from {}",
            s.radio,
            util::channel_label(s.operating.as_ref()),
        ),
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
