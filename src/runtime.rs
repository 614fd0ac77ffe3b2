//! The serve loop. Widget update timers, plugin update requests and
//! shutdown signals are all event sources on one calloop loop, with the
//! shared shell as its data.

use crate::error::Result;
use crate::plugin::Capability;
use crate::state::{lock, SharedShell};
use calloop::channel::{self, Event as ChannelEvent};
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopSignal};
use log::{debug, info};
use std::collections::HashSet;
use std::time::Duration;

pub struct Runtime {
    event_loop: EventLoop<'static, SharedShell>,
    /// Serials of the instances that already have a timer source.
    timed: HashSet<u64>,
}

impl Runtime {
    pub fn new() -> Result<Self> {
        Ok(Self {
            event_loop: EventLoop::try_new()?,
            timed: HashSet::new(),
        })
    }

    /// Stops the loop on SIGINT or SIGTERM. The signals are blocked for the
    /// calling thread, so call this before spawning threads that should
    /// inherit the mask.
    pub fn stop_on_signals(&mut self) -> Result<()> {
        let stop = self.event_loop.get_signal();
        let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])?;
        self.event_loop
            .handle()
            .insert_source(signals, move |event, _, _| {
                info!("Received {:?}, stopping", event.signal());
                stop.stop();
            })
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Routes plugin `request_update` calls through a channel served by
    /// this loop, so they run outside the plugin call that made them.
    pub fn watch_requests(&mut self, shell: &SharedShell) -> Result<()> {
        let (sender, requests) = channel::channel::<usize>();
        self.event_loop
            .handle()
            .insert_source(requests, |event, _, shell: &mut SharedShell| {
                if let ChannelEvent::Msg(index) = event {
                    lock(shell).registry.update(index);
                }
            })
            .map_err(|e| e.error)?;
        lock(shell).registry.route_updates(sender);
        Ok(())
    }

    /// Gives every running simple widget with an update interval its own
    /// timer. Returns how many timers were added.
    pub fn sync_timers(&mut self, shell: &SharedShell) -> Result<usize> {
        let due: Vec<(usize, u64, Duration)> = {
            let shell = lock(shell);
            let running: HashSet<u64> = shell.registry.instances().map(|p| p.serial).collect();
            self.timed.retain(|serial| running.contains(serial));
            shell
                .registry
                .instances()
                .filter(|p| !self.timed.contains(&p.serial))
                .filter_map(|p| match &p.capability {
                    Capability::SimpleWidget {
                        interval: Some(interval),
                        ..
                    } => Some((p.index, p.serial, *interval)),
                    _ => None,
                })
                .collect()
        };

        for &(index, serial, interval) in &due {
            self.event_loop
                .handle()
                .insert_source(
                    Timer::from_duration(interval),
                    move |_, _, shell: &mut SharedShell| {
                        let shell = lock(shell);
                        if shell.registry.instance(index).map(|p| p.serial) != Some(serial) {
                            debug!("Instance {} is gone, dropping its timer", index);
                            return TimeoutAction::Drop;
                        }
                        shell.registry.update(index);
                        TimeoutAction::ToDuration(interval)
                    },
                )
                .map_err(|e| e.error)?;
            self.timed.insert(serial);
            debug!("Instance {} updates every {:?}", index, interval);
        }
        Ok(due.len())
    }

    pub fn signal(&self) -> LoopSignal {
        self.event_loop.get_signal()
    }

    /// One round of the loop, waiting at most `timeout`.
    pub fn dispatch(&mut self, timeout: Option<Duration>, shell: &mut SharedShell) -> Result<()> {
        self.event_loop.dispatch(timeout, shell)?;
        Ok(())
    }

    /// Dispatches until stopped by a signal or [`LoopSignal::stop`].
    pub fn run(&mut self, shell: &mut SharedShell) -> Result<()> {
        self.event_loop.run(None, shell, |_| {})?;
        Ok(())
    }
}
