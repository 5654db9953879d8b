/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per operation state shared by a coder and its caller
//!
//! A [`CoderState`] binds one stream to the options, limits, stop signal and
//! progress sink of a single decode or encode. It borrows the stream, so it
//! can never outlive it, and it is torn down when the operation ends,
//! interrupted operations are never resumed.
use std::io::{Read, Write};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use enough::{Stop, StopReason};
use imcodec_core::bytestream::{ByteReader, ByteWriter};
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::DecoderLimits;

use crate::errors::{ImageErrors, Stage};
use crate::format::ImageFormat;
use crate::options::CoderOptions;
use crate::traits::{Progress, ProgressSink};

/// A cancellation signal that can be shared between threads
///
/// Cloning gives another handle to the same signal.
///
/// # Example
/// ```
/// use imcodec::state::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
///
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Ask every operation observing this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Stop for CancellationToken {
    fn check(&self) -> Result<(), StopReason> {
        if self.is_cancelled() {
            return Err(StopReason::Cancelled);
        }
        Ok(())
    }
}

/// State of one decode or encode operation on stream type `S`
pub struct CoderState<'a, S: ?Sized> {
    stream:      &'a mut S,
    format:      ImageFormat,
    options:     CoderOptions,
    limits:      DecoderLimits,
    stop:        Option<&'a dyn Stop>,
    progress:    Option<Box<dyn ProgressSink + 'a>>,
    frame_index: usize
}

/// State of a decode, reading from any stream
pub type DecodeState<'a> = CoderState<'a, ByteReader<dyn Read + 'a>>;

/// State of an encode, writing to any sink
pub type EncodeState<'a> = CoderState<'a, ByteWriter<dyn Write + 'a>>;

impl<'a, S: ?Sized> CoderState<'a, S> {
    /// Bind `stream` to an operation on `format`
    pub fn new(stream: &'a mut S, format: ImageFormat) -> CoderState<'a, S> {
        CoderState {
            stream,
            format,
            options: CoderOptions::Default,
            limits: DecoderLimits::default(),
            stop: None,
            progress: None,
            frame_index: 0
        }
    }

    pub fn with_options(mut self, options: CoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Observe `stop` at every row boundary
    pub fn with_stop(mut self, stop: &'a dyn Stop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Report progress to `sink`, coders without the progress
    /// capability never call it
    pub fn with_progress(mut self, sink: Box<dyn ProgressSink + 'a>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn options(&self) -> &CoderOptions {
        &self.options
    }

    pub const fn limits(&self) -> DecoderLimits {
        self.limits
    }

    /// Index of the frame being processed, starting at zero
    pub const fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Whether the stop signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.stop.is_some_and(|stop| stop.check().is_err())
    }

    pub fn stream(&mut self) -> &mut S {
        self.stream
    }

    /// The stream together with a monitor to hand to a format codec
    pub fn parts(&mut self) -> (&mut S, CoderMonitor<'_, 'a>) {
        let monitor = CoderMonitor {
            stop:        self.stop,
            progress:    self.progress.as_deref_mut(),
            frame_index: self.frame_index
        };
        (&mut *self.stream, monitor)
    }

    /// Move on to the next frame
    pub fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// The error to return when this operation was stopped during `stage`
    pub fn interrupted(&self, stage: Stage) -> ImageErrors {
        ImageErrors::Interrupted {
            format: self.format,
            stage
        }
    }
}

/// Forwards row notices from a format codec to the stop signal
/// and the progress sink of a [`CoderState`]
pub struct CoderMonitor<'s, 'a> {
    stop:        Option<&'a dyn Stop>,
    progress:    Option<&'s mut (dyn ProgressSink + 'a)>,
    frame_index: usize
}

impl CoderMonitor<'_, '_> {
    /// Check for cancellation without reporting progress
    pub fn should_stop(&self) -> bool {
        self.stop.is_some_and(|stop| stop.check().is_err())
    }
}

impl RowMonitor for CoderMonitor<'_, '_> {
    fn rows_done(&mut self, rows_done: usize, total_rows: usize, dirty: Option<Rect>) -> bool {
        if self.should_stop() {
            return false;
        }
        let Some(sink) = self.progress.as_deref_mut() else {
            return true;
        };
        let percent = match total_rows {
            0 => 100,
            total => (rows_done.min(total) * 100 / total) as u8
        };
        let progress = Progress {
            percent,
            dirty,
            frame_index: self.frame_index
        };
        matches!(sink.on_progress(progress), ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_reports_percentages() {
        let mut seen = vec![];
        let mut stream = ByteWriter::new(Vec::new());
        {
            let sink = |p: Progress| {
                seen.push(p.percent);
                ControlFlow::Continue(())
            };
            let mut state = CoderState::new(&mut stream, ImageFormat::BMP).with_progress(Box::new(sink));
            let (_, mut monitor) = state.parts();

            assert!(monitor.rows_done(0, 4, None));
            assert!(monitor.rows_done(1, 4, None));
            assert!(monitor.rows_done(4, 4, Some(Rect::new(0, 3, 2, 1))));
            assert!(monitor.rows_done(0, 0, None));
        }
        assert_eq!(seen, [0, 25, 100, 100]);
    }

    #[test]
    fn cancelled_tokens_stop_monitors() {
        let token = CancellationToken::new();
        let mut stream = ByteWriter::new(Vec::new());
        let mut state = CoderState::new(&mut stream, ImageFormat::PNG).with_stop(&token);

        assert!(!state.is_cancelled());
        assert!(state.parts().1.rows_done(0, 1, None));

        token.cancel();
        assert!(state.is_cancelled());
        assert!(!state.parts().1.rows_done(0, 1, None));
        assert!(state.interrupted(Stage::Encode).is_interrupted());
    }

    #[test]
    fn breaking_sinks_stop_monitors() {
        let mut stream = ByteWriter::new(Vec::new());
        let sink = |p: Progress| match p.percent {
            50.. => ControlFlow::Break(()),
            _ => ControlFlow::Continue(())
        };
        let mut state = CoderState::new(&mut stream, ImageFormat::TGA).with_progress(Box::new(sink));
        let (_, mut monitor) = state.parts();

        assert!(monitor.rows_done(1, 4, None));
        assert!(!monitor.rows_done(2, 4, None));
    }
}
