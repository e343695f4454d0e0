//! Adapters over the blocking hardware audio channels.
//!
//! The hardware primitives ([`PcmSink`], [`PcmSource`]) wait without a
//! timeout and may move fewer bytes than asked. [`OutputTransport`] hides the
//! short writes; [`InputTransport`] hands short reads straight back to the
//! caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The hardware channel was never opened.
    #[error("transport unavailable")]
    Unavailable,

    /// The hardware primitive reported an error for this call.
    #[error("transport failure: {0}")]
    Failure(String),
}

/// Blocking write primitive of a hardware output channel.
pub trait PcmSink: Send {
    /// Hand `buf` to the hardware, returning how many leading bytes were
    /// accepted. May be fewer than `buf.len()`.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;
}

/// Blocking read primitive of a hardware input channel.
pub trait PcmSource: Send {
    /// Fill the front of `buf`, returning how many bytes were produced.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

pub struct OutputTransport<S> {
    channel: Option<S>,
}

impl<S: PcmSink> OutputTransport<S> {
    pub fn new(channel: Option<S>) -> Self {
        Self { channel }
    }

    pub fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    /// Deliver all of `buf` to the hardware.
    ///
    /// Short writes are resumed from the first unaccepted byte until the
    /// whole buffer is taken. An error from the primitive ends the call and
    /// is not retried.
    pub fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let channel = self.channel.as_mut().ok_or(TransportError::Unavailable)?;

        let mut written = 0;
        while written < buf.len() {
            written += channel.write(&buf[written..])?;
        }
        Ok(())
    }
}

pub struct InputTransport<R> {
    channel: Option<R>,
}

impl<R: PcmSource> InputTransport<R> {
    pub fn new(channel: Option<R>) -> Self {
        Self { channel }
    }

    pub fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    /// One blocking read; a short count is returned as is.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let channel = self.channel.as_mut().ok_or(TransportError::Unavailable)?;
        channel.read(buf)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Sink that accepts a scripted number of bytes per call and records
    /// every call's offset into the original buffer.
    #[derive(Default)]
    pub struct ScriptedSink {
        pub script: VecDeque<Result<usize, TransportError>>,
        /// Per-call cap when the script runs dry
        pub max_per_call: usize,
        pub received: Arc<Mutex<Vec<u8>>>,
        pub calls: Arc<Mutex<Vec<usize>>>,
    }

    impl ScriptedSink {
        pub fn chunked(max_per_call: usize) -> Self {
            Self {
                max_per_call,
                ..Default::default()
            }
        }

        pub fn scripted(script: Vec<Result<usize, TransportError>>) -> Self {
            Self {
                script: script.into(),
                max_per_call: usize::MAX,
                ..Default::default()
            }
        }
    }

    impl PcmSink for ScriptedSink {
        fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
            let mut received = self.received.lock().unwrap();
            self.calls.lock().unwrap().push(received.len());
            let accepted = match self.script.pop_front() {
                Some(step) => step?,
                None => self.max_per_call,
            }
            .min(buf.len());
            received.extend_from_slice(&buf[..accepted]);
            Ok(accepted)
        }
    }

    /// Source that yields a fixed chunk per read, or a scripted error.
    pub struct ScriptedSource {
        pub data: Vec<u8>,
        pub fail_with: Option<TransportError>,
        pub calls: Arc<Mutex<usize>>,
    }

    impl ScriptedSource {
        pub fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                fail_with: None,
                calls: Arc::default(),
            }
        }
    }

    impl PcmSource for ScriptedSource {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            Ok(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{ScriptedSink, ScriptedSource};
    use super::*;

    #[test]
    fn test_partial_writes_resume_at_offset() {
        let sink = ScriptedSink::scripted(vec![Ok(40), Ok(40), Ok(20)]);
        let calls = sink.calls.clone();
        let received = sink.received.clone();
        let mut out = OutputTransport::new(Some(sink));

        let buf: Vec<u8> = (0..100u8).collect();
        assert_eq!(out.write(&buf), Ok(()));

        assert_eq!(*calls.lock().unwrap(), vec![0, 40, 80]);
        assert_eq!(*received.lock().unwrap(), buf);
    }

    #[test]
    fn test_call_count_is_ceil_len_over_k() {
        for (len, k) in [(100usize, 40usize), (96, 32), (1, 7), (512, 1), (257, 64)] {
            let sink = ScriptedSink::chunked(k);
            let calls = sink.calls.clone();
            let received = sink.received.clone();
            let mut out = OutputTransport::new(Some(sink));

            let buf = vec![0xA5u8; len];
            out.write(&buf).unwrap();

            assert_eq!(calls.lock().unwrap().len(), len.div_ceil(k), "len={} k={}", len, k);
            assert_eq!(received.lock().unwrap().len(), len);
        }
    }

    #[test]
    fn test_zero_byte_write_is_waited_on() {
        let sink = ScriptedSink::scripted(vec![Ok(0), Ok(10), Ok(0), Ok(6)]);
        let calls = sink.calls.clone();
        let mut out = OutputTransport::new(Some(sink));
        out.write(&[1u8; 16]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![0, 0, 10, 10]);
    }

    #[test]
    fn test_failure_is_not_retried() {
        let sink = ScriptedSink::scripted(vec![
            Ok(40),
            Err(TransportError::Failure("underrun".into())),
            Ok(60),
        ]);
        let calls = sink.calls.clone();
        let mut out = OutputTransport::new(Some(sink));

        let err = out.write(&[0u8; 100]).unwrap_err();
        assert_eq!(err, TransportError::Failure("underrun".into()));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_write_skips_hardware() {
        let sink = ScriptedSink::chunked(8);
        let calls = sink.calls.clone();
        let mut out = OutputTransport::new(Some(sink));
        out.write(&[]).unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_output() {
        let mut out: OutputTransport<ScriptedSink> = OutputTransport::new(None);
        assert!(!out.is_available());
        assert_eq!(out.write(&[0u8; 4]), Err(TransportError::Unavailable));
    }

    #[test]
    fn test_single_read_returns_short_count() {
        let source = ScriptedSource::new(vec![7u8; 10]);
        let calls = source.calls.clone();
        let mut input = InputTransport::new(Some(source));

        let mut buf = [0u8; 64];
        assert_eq!(input.read(&mut buf), Ok(10));
        assert_eq!(&buf[..10], &[7u8; 10]);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_read_failure_propagates() {
        let mut source = ScriptedSource::new(Vec::new());
        source.fail_with = Some(TransportError::Failure("overrun".into()));
        let mut input = InputTransport::new(Some(source));
        assert_eq!(
            input.read(&mut [0u8; 8]),
            Err(TransportError::Failure("overrun".into()))
        );
    }

    #[test]
    fn test_unavailable_input() {
        let mut input: InputTransport<ScriptedSource> = InputTransport::new(None);
        assert!(!input.is_available());
        assert_eq!(input.read(&mut [0u8; 4]), Err(TransportError::Unavailable));
    }
}
