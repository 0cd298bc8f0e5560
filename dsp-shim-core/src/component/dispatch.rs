//! Built-in dispatch functions, one per component class.
//!
//! - `unia_codec`: compressed codecs; every command is forwarded to the core.
//! - `pcm_codec`: raw PCM; processing happens on the host in whole sample
//!   frames, parameters still reach the core.
//! - `renderer`: sinks PCM into the core and never produces output.

use tracing::warn;

use super::{Command, CommandValue, ComponentCore, ParamId, Status};

pub fn unia_codec(
    core: &mut ComponentCore,
    command: Command,
    _index: u32,
    value: &mut CommandValue<'_>,
) -> Status {
    match command {
        Command::Process => {
            let CommandValue::Process(args) = value else {
                return Status::BAD_PAYLOAD;
            };
            match core.link.process(args.input, args.output) {
                Ok(transfer) => {
                    args.consumed = transfer.consumed;
                    args.produced = transfer.produced;
                    Status::OK
                }
                Err(e) => {
                    warn!(kind = ?core.kind, "process failed: {e}");
                    Status::from_link_error(&e)
                }
            }
        }
        _ => control(core, command, value),
    }
}

pub fn pcm_codec(
    core: &mut ComponentCore,
    command: Command,
    _index: u32,
    value: &mut CommandValue<'_>,
) -> Status {
    match command {
        Command::Process => {
            let CommandValue::Process(args) = value else {
                return Status::BAD_PAYLOAD;
            };
            let frame_bytes = core.channels as usize * (core.depth as usize / 8);
            if frame_bytes == 0 {
                return Status::BAD_CONFIG;
            }
            let span = args.input.len().min(args.output.len());
            let n = span - span % frame_bytes;
            if n == 0 {
                return Status::NEED_MORE_INPUT;
            }
            args.output[..n].copy_from_slice(&args.input[..n]);
            args.consumed = n;
            args.produced = n;
            Status::OK
        }
        _ => control(core, command, value),
    }
}

pub fn renderer(
    core: &mut ComponentCore,
    command: Command,
    _index: u32,
    value: &mut CommandValue<'_>,
) -> Status {
    match command {
        Command::Process => {
            let CommandValue::Process(args) = value else {
                return Status::BAD_PAYLOAD;
            };
            match core.link.process(args.input, &mut []) {
                Ok(transfer) => {
                    args.consumed = transfer.consumed;
                    args.produced = 0;
                    Status::OK
                }
                Err(e) => {
                    warn!(kind = ?core.kind, "render failed: {e}");
                    Status::from_link_error(&e)
                }
            }
        }
        _ => control(core, command, value),
    }
}

/// Everything except `Process` is handled the same way by every class.
fn control(core: &mut ComponentCore, command: Command, value: &mut CommandValue<'_>) -> Status {
    let result = match (command, value) {
        (Command::Init, _) => core.link.init(),
        (Command::Reset, _) => core.link.reset(),
        (Command::Teardown, _) => {
            core.link.close();
            Ok(())
        }
        (Command::SetParam, CommandValue::Param { id, value }) => {
            match id {
                ParamId::Channels => core.channels = *value,
                ParamId::Depth => core.depth = *value,
                _ => {}
            }
            core.link.set_param(*id, *value)
        }
        (Command::SetParam, CommandValue::CodecData(data)) => core.link.set_codec_data(*data),
        (Command::GetParam, CommandValue::Param { id, value }) => match id {
            ParamId::Channels => {
                *value = core.channels;
                Ok(())
            }
            ParamId::Depth => {
                *value = core.depth;
                Ok(())
            }
            _ => core.link.get_param(*id).map(|v| *value = v),
        },
        _ => return Status::BAD_PAYLOAD,
    };

    match result {
        Ok(()) => Status::OK,
        Err(e) => Status::from_link_error(&e),
    }
}
