use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::device::DeviceError;

enum Command {
    Run(Box<dyn FnOnce() + Send>),
    Fence(mpsc::SyncSender<()>),
}

/// In-order asynchronous command queue.
///
/// Commands are executed by a dedicated worker thread in the order they were
/// issued. Nothing a stream does is guaranteed to be visible to the host until
/// `synchronize` returns.
pub struct Stream {
    id: usize,
    sender: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl Stream {
    pub(crate) fn spawn(id: usize) -> Result<Self, DeviceError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let worker = thread::Builder::new()
            .name(format!("stream-{}", id))
            .spawn(move || {
                for command in receiver {
                    match command {
                        Command::Run(op) => op(),
                        Command::Fence(done) => {
                            // the waiter may have given up; nothing to report then
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|source| DeviceError::StreamCreate { id, source })?;

        Ok(Self {
            id,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn send(&self, command: Command) -> Result<(), DeviceError> {
        self.sender
            .as_ref()
            .ok_or(DeviceError::StreamLost { id: self.id })?
            .send(command)
            .map_err(|_| DeviceError::StreamLost { id: self.id })
    }

    /// Queue `op` behind everything already issued on this stream.
    pub fn enqueue<F: FnOnce() + Send + 'static>(&self, op: F) -> Result<(), DeviceError> {
        self.send(Command::Run(Box::new(op)))
    }

    /// Block until every command issued so far has completed.
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        let (done, wait) = mpsc::sync_channel(1);
        self.send(Command::Fence(done))?;
        wait.recv().map_err(|_| DeviceError::StreamLost { id: self.id })
    }

    /// Drain the queue and stop the worker.
    pub fn destroy(mut self) -> Result<(), DeviceError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), DeviceError> {
        // closing the channel ends the worker loop once queued work is done
        self.sender.take();
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| DeviceError::StreamDestroy { id: self.id }),
            None => Ok(()),
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "stream dropped without being destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn commands_run_in_issue_order() {
        let stream = Stream::spawn(0).unwrap();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..8 {
            let log = log.clone();
            stream.enqueue(move || log.lock().push(i)).unwrap();
        }
        stream.synchronize().unwrap();
        assert_eq!(*log.lock(), (0..8).collect::<Vec<_>>());
        stream.destroy().unwrap();
    }

    #[test]
    fn destroy_drains_pending_work() {
        let stream = Stream::spawn(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let counter = counter.clone();
            stream.enqueue(move || { counter.fetch_add(1, Ordering::SeqCst); }).unwrap();
        }
        stream.destroy().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn panicking_command_loses_the_stream() {
        let stream = Stream::spawn(2).unwrap();
        stream.enqueue(|| panic!("kernel fault")).unwrap();
        assert!(matches!(stream.synchronize(), Err(DeviceError::StreamLost { id: 2 })));
        assert!(matches!(stream.destroy(), Err(DeviceError::StreamDestroy { id: 2 })));
    }
}
