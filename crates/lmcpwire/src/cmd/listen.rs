use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lmcpwire_frame::{EnvelopeReader, FrameError};
use lmcpwire_transport::TcpServer;
use tracing::debug;

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let server =
        TcpServer::bind(&args.endpoint).map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let link = server
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let peer = link
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        debug!(%peer, "sender connected");

        let mut reader = EnvelopeReader::new(link);
        while running.load(Ordering::SeqCst) {
            let envelope = match reader.read_envelope() {
                Ok(envelope) => envelope,
                Err(FrameError::ConnectionClosed) => {
                    debug!(%peer, "sender disconnected");
                    break;
                }
                Err(err) => return Err(frame_error("receive failed", err)),
            };

            print_envelope(&envelope, &peer, format);
            printed = printed.saturating_add(1);

            if args.count.is_some_and(|count| printed >= count) {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}
