/// Periodic outbound message task
///
/// One tokio task owns the timer. Handles talk to it over a command channel;
/// the running flag is an atomic so status reads never wait on the task.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

use super::wecom_client::MessageSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<SchedulerCommand>,
    running: Arc<AtomicBool>,
    interval: Duration,
}

impl SchedulerHandle {
    /// Spawn the scheduler task in the stopped state
    pub fn spawn<S: MessageSender>(sender: Arc<S>, interval: Duration, message: String) -> Self {
        let (tx, rx) = mpsc::channel(8);
        let scheduler = TimerScheduler {
            sender,
            interval,
            message,
            commands: rx,
        };
        tokio::spawn(scheduler.run());

        Self {
            commands: tx,
            running: Arc::new(AtomicBool::new(false)),
            interval,
        }
    }

    /// Start periodic sending. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            log::warn!("Timer already running");
            return false;
        }
        if self.commands.send(SchedulerCommand::Start).await.is_err() {
            log::error!("Scheduler task is gone, cannot start timer");
            self.running.store(false, Ordering::SeqCst);
            return false;
        }
        log::info!("⏱️  Timer started, interval {:?}", self.interval);
        true
    }

    /// Stop periodic sending. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        if self.commands.send(SchedulerCommand::Stop).await.is_err() {
            log::error!("Scheduler task is gone");
        }
        log::info!("Timer stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

struct TimerScheduler<S> {
    sender: Arc<S>,
    interval: Duration,
    message: String,
    commands: mpsc::Receiver<SchedulerCommand>,
}

impl<S: MessageSender> TimerScheduler<S> {
    async fn run(mut self) {
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SchedulerCommand::Start) => {
                        if ticker.is_none() {
                            let mut interval = time::interval(self.interval);
                            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            ticker = Some(interval);
                        }
                    }
                    Some(SchedulerCommand::Stop) => ticker = None,
                    // Every handle dropped
                    None => break,
                },
                _ = next_tick(&mut ticker) => self.send_once().await,
            }
        }

        log::debug!("Scheduler task exiting");
    }

    async fn send_once(&self) {
        match self.sender.send_text(&self.message).await {
            Ok(()) => log::info!("Scheduled message sent at {}", chrono::Local::now()),
            Err(e) => log::error!("Scheduled message failed: {}", e),
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
