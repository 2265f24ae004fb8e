//! Async link I/O task — reactor-driven transport bridge.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! multi-task scheduling and `async-io-mini` for reactor-driven
//! timers (no busy-spinning). Three concurrent futures:
//!
//! 1. **Supervise** — checks the link every second; while it is down,
//!    retries `connect()` every `reconnect_delay_ms` and re-subscribes
//!    the command topic after each (re)connect
//! 2. **Read** — polls `read()` every 10ms via reactor timer
//! 3. **Write** — truly async via `Mailbox::next_outbound().await`
//!    (wakes instantly when the control loop queues a publish)
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────────┐
//!  │  I/O Thread                                                │
//!  │  ┌──────────────────────────────────────────────────────┐  │
//!  │  │  futures_lite::block_on (drives executor)            │  │
//!  │  │  ┌──────────────────────────────────────────────────┐│  │
//!  │  │  │  edge_executor::LocalExecutor                    ││  │
//!  │  │  │                                                  ││  │
//!  │  │  │  ┌───────────┐  ┌──────────┐  ┌───────────────┐  ││  │
//!  │  │  │  │ Supervise │  │ Read     │  │ Write (async) │  ││  │
//!  │  │  │  │ 1s / 5s ⏱ │  │ 10ms ⏱   │  │ wake-on-send  │  ││  │
//!  │  │  │  └───────────┘  └──────────┘  └───────────────┘  ││  │
//!  │  │  └──────────────────────────────────────────────────┘│  │
//!  │  └──────────────────────────────────────────────────────┘  │
//!  └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A publish queued while the link is down is dropped.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, info, warn};

use super::mailbox::{MAX_PAYLOAD_LEN, Mailbox, OutboundMessage};
use super::topics::Topics;
use super::transport::Transport;

/// Link check period while connected.
const SUPERVISE_PERIOD_MS: u64 = 1_000;

const READ_PERIOD_MS: u64 = 10;

/// Upper bound on messages moved per read tick.
const MAX_READS_PER_TICK: usize = 8;

// ── Link supervision ─────────────────────────────────────────

/// Tracks whether the command topic is subscribed on the current
/// connection.
#[derive(Debug, Default)]
pub struct LinkState {
    subscribed: bool,
}

impl LinkState {
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

/// One supervision step. Returns `true` if the link is up and
/// subscribed afterwards.
pub fn supervise<T: Transport>(
    transport: &mut T,
    topics: &Topics,
    mailbox: &Mailbox,
    state: &mut LinkState,
) -> bool {
    if !transport.is_connected() {
        if state.subscribed {
            warn!("LINK | connection lost");
        }
        state.subscribed = false;
        mailbox.set_connected(false);
        if let Err(e) = transport.connect() {
            warn!("LINK | connect failed: {:?}", e);
            return false;
        }
        info!("LINK | connected");
    }

    if !state.subscribed {
        match transport.subscribe(&topics.commands) {
            Ok(()) => {
                info!("LINK | subscribed to {}", topics.commands);
                state.subscribed = true;
            }
            Err(e) => warn!("LINK | subscribe to {} failed: {:?}", topics.commands, e),
        }
    }

    mailbox.set_connected(state.subscribed);
    state.subscribed
}

/// Move received payloads into the mailbox. Returns how many were posted.
pub fn pump_inbound<T: Transport>(transport: &mut T, mailbox: &Mailbox, buf: &mut [u8]) -> usize {
    let mut posted = 0;
    for _ in 0..MAX_READS_PER_TICK {
        match transport.read(buf) {
            Ok(Some(n)) => {
                if mailbox.post_command(&buf[..n]) {
                    posted += 1;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("LINK | read failed: {:?}", e);
                break;
            }
        }
    }
    posted
}

/// Publish one outbound message. Returns `false` if it was dropped.
pub fn deliver<T: Transport>(transport: &mut T, msg: &OutboundMessage) -> bool {
    if !transport.is_connected() {
        debug!("LINK | offline, dropping publish to {}", msg.topic);
        return false;
    }
    match transport.publish(&msg.topic, &msg.payload) {
        Ok(()) => true,
        Err(e) => {
            warn!("LINK | publish to {} failed: {:?}", msg.topic, e);
            false
        }
    }
}

// ── Async I/O loop ───────────────────────────────────────────

type Shared<T> = Rc<RefCell<T>>;

async fn supervise_loop<T: Transport>(
    transport: Shared<T>,
    topics: Rc<Topics>,
    mailbox: Arc<Mailbox>,
    reconnect_delay: Duration,
) {
    let mut state = LinkState::default();
    loop {
        let up = supervise(&mut *transport.borrow_mut(), &topics, &mailbox, &mut state);
        let wait = if up {
            Duration::from_millis(SUPERVISE_PERIOD_MS)
        } else {
            reconnect_delay
        };
        async_io_mini::Timer::after(wait).await;
    }
}

async fn read_loop<T: Transport>(transport: Shared<T>, mailbox: Arc<Mailbox>) {
    let mut buf = [0u8; MAX_PAYLOAD_LEN];
    loop {
        pump_inbound(&mut *transport.borrow_mut(), &mailbox, &mut buf);
        async_io_mini::Timer::after(Duration::from_millis(READ_PERIOD_MS)).await;
    }
}

async fn write_loop<T: Transport>(transport: Shared<T>, mailbox: Arc<Mailbox>) {
    loop {
        let msg = mailbox.next_outbound().await;
        deliver(&mut *transport.borrow_mut(), &msg);
    }
}

/// Entry point for the I/O thread. Sets up the executor, spawns the
/// three async tasks, and drives them until the process ends.
fn run_io_loop<T: Transport + 'static>(
    transport: T,
    topics: Topics,
    mailbox: Arc<Mailbox>,
    reconnect_delay: Duration,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let transport: Shared<T> = Rc::new(RefCell::new(transport));
    let topics = Rc::new(topics);

    executor
        .spawn(supervise_loop(
            transport.clone(),
            topics,
            mailbox.clone(),
            reconnect_delay,
        ))
        .detach();
    executor
        .spawn(read_loop(transport.clone(), mailbox.clone()))
        .detach();
    executor.spawn(write_loop(transport, mailbox)).detach();

    info!(
        "LINK | I/O task started (reconnect every {} ms)",
        reconnect_delay.as_millis()
    );

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

// ── Thread spawn ─────────────────────────────────────────────

const IO_STACK_SIZE: usize = 12 * 1024;

/// Spawn the I/O task in a dedicated thread. Takes ownership of the
/// transport.
pub fn spawn<T: Transport + Send + 'static>(
    transport: T,
    topics: Topics,
    mailbox: Arc<Mailbox>,
    reconnect_delay_ms: u32,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let reconnect_delay = Duration::from_millis(u64::from(reconnect_delay_ms));
    std::thread::Builder::new()
        .name("link-io".into())
        .stack_size(IO_STACK_SIZE)
        .spawn(move || run_io_loop(transport, topics, mailbox, reconnect_delay))
}

// ── Tests ────────────────────────────────────────────────────
