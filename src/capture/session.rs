/// Retry-driven capture state machine

use crate::capture::config::CaptureConfig;
use crate::capture::device::{CaptureDevice, ReadStatus};
use crate::decode::{decode_sector, SectorAddress};
use crate::error::{H17Error, Result};
use crate::format::constants::SECTORS_PER_TRACK;
use crate::format::{BlockType, TrackSource};
use crate::image::{
    Block, DataBlock, DiskImage, Flags, RawDataBlock, RawSector, RawTrack, Sector, Track,
};
use crate::io::writer::{ImageWriter, PendingLength};
use crate::status::SectorError;
use std::collections::VecDeque;
use std::fmt;
use std::io::{Seek, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a driver sets to stop a capture between sector attempts
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where the session is in the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Between tracks
    Idle,
    /// Positioning the head for the next track
    Seeking,
    /// Reading the given sector
    ReadingSector(u8),
    /// All sectors of the track have a committed result
    TrackComplete,
    /// Output finalized; no more events
    Done,
}

/// Progress reported by [`CaptureSession::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Head is positioned and reading begins
    TrackStarted {
        /// Side
        side: u8,
        /// Logical track
        track: u8,
    },
    /// A read attempt is about to be made
    SectorAttempted {
        /// Side
        side: u8,
        /// Logical track
        track: u8,
        /// Sector
        sector: u8,
        /// Attempt number, from 1
        attempt: u8,
    },
    /// A sector's result was committed
    SectorResult {
        /// Side
        side: u8,
        /// Logical track
        track: u8,
        /// Sector
        sector: u8,
        /// Committed outcome
        error: SectorError,
        /// Attempts used
        attempts: u8,
    },
    /// A track was written
    TrackComplete {
        /// Side
        side: u8,
        /// Logical track
        track: u8,
        /// Sectors with errors
        errors: usize,
        /// All ten sectors were read before backfilling
        complete: bool,
    },
    /// Capture stopped on request; the partial track was written
    Cancelled {
        /// Side
        side: u8,
        /// Logical track
        track: u8,
        /// Sectors committed on the partial track
        sectors: usize,
    },
    /// Every track was captured and the output finalized
    Finished {
        /// Tracks written
        tracks: usize,
        /// Sectors with errors across the disk
        errors: usize,
    },
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::TrackStarted { side, track } => {
                write!(f, "Side {} track {:>2}: reading", side, track)
            }
            CaptureEvent::SectorAttempted {
                side,
                track,
                sector,
                attempt,
            } => write!(
                f,
                "Side {} track {:>2} sector {}: attempt {}",
                side, track, sector, attempt
            ),
            CaptureEvent::SectorResult {
                side,
                track,
                sector,
                error,
                attempts,
            } => write!(
                f,
                "Side {} track {:>2} sector {}: {} after {} attempt(s)",
                side, track, sector, error, attempts
            ),
            CaptureEvent::TrackComplete {
                side,
                track,
                errors,
                complete,
            } => write!(
                f,
                "Side {} track {:>2}: done, {} error(s){}",
                side,
                track,
                errors,
                if *complete { "" } else { ", incomplete" }
            ),
            CaptureEvent::Cancelled {
                side,
                track,
                sectors,
            } => write!(
                f,
                "Cancelled at side {} track {} with {} sector(s) kept",
                side, track, sectors
            ),
            CaptureEvent::Finished { tracks, errors } => {
                write!(f, "Finished: {} tracks, {} sector error(s)", tracks, errors)
            }
        }
    }
}

/// A capture of one disk into an H17D file
///
/// Drive it by calling [`poll`](Self::poll) until it returns `None`. Each
/// call does at most one device operation. Completed tracks are written to
/// the sink as they finish; the Data block length is patched and raw
/// captures appended when the session ends, is cancelled, or fails.
pub struct CaptureSession<D: CaptureDevice, W: Write + Seek> {
    device: D,
    config: CaptureConfig,
    writer: Option<ImageWriter<W>>,
    data_block: Option<PendingLength>,
    sink: Option<W>,
    image: DiskImage,
    data: DataBlock,
    raw: RawDataBlock,
    state: CaptureState,
    started: bool,
    track_index: usize,
    order_index: usize,
    attempt: u8,
    head: Option<u8>,
    committed: Vec<Sector>,
    raw_slots: Vec<Option<Vec<u8>>>,
    events: VecDeque<CaptureEvent>,
    cancel: CancelHandle,
}

impl<D: CaptureDevice, W: Write + Seek> CaptureSession<D, W> {
    /// Start a session, writing the file header and metadata blocks
    pub fn new(device: D, config: CaptureConfig, sink: W) -> Result<Self> {
        config.validate()?;

        let mut image = DiskImage::new();
        image.set_disk_format(config.sides, config.tracks);
        image.set_flags(Flags {
            write_protect: config.write_protect,
            distribution: config.distribution,
            track_source: TrackSource::CapturedOnModernHardware,
        });
        if let Some(label) = &config.label {
            image.set_label(label.clone());
        }
        if let Some(comment) = &config.comment {
            image.set_comment(comment.clone());
        }
        image.set_block(Block::Date(
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ));
        image.set_block(Block::Imager(device.description()));
        image.set_block(Block::Program(format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )));

        let mut writer = ImageWriter::new(sink)?;
        for block in image.blocks() {
            writer.write_block(block)?;
        }
        let data_block = writer.begin_block(BlockType::Data)?;

        Ok(Self {
            device,
            config,
            writer: Some(writer),
            data_block: Some(data_block),
            sink: None,
            image,
            data: DataBlock::new(),
            raw: RawDataBlock::new(),
            state: CaptureState::Idle,
            started: false,
            track_index: 0,
            order_index: 0,
            attempt: 0,
            head: None,
            committed: Vec::with_capacity(SECTORS_PER_TRACK),
            raw_slots: vec![None; SECTORS_PER_TRACK],
            events: VecDeque::new(),
            cancel: CancelHandle::default(),
        })
    }

    /// Current state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Settings in use
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The image as captured so far
    ///
    /// Data and raw blocks are attached when the session ends.
    pub fn image(&self) -> &DiskImage {
        &self.image
    }

    /// Get a reference to the device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Handle that can cancel this session from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation before the next sector attempt
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Advance until the next event
    ///
    /// Returns `Ok(None)` once the session is done. A device failure ends
    /// the session: the output is finalized and then the error returned.
    pub fn poll(&mut self) -> Result<Option<CaptureEvent>> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            if self.state == CaptureState::Done {
                return Ok(None);
            }
            if let Err(err) = self.step() {
                log::warn!("Capture aborted: {}", err);
                self.abort();
                return Err(err);
            }
        }
    }

    /// Poll to completion, discarding events
    pub fn run(&mut self) -> Result<()> {
        while self.poll()?.is_some() {}
        Ok(())
    }

    /// Finalize if needed and hand back the image and the sink
    pub fn finish(mut self) -> Result<(DiskImage, W)> {
        if self.state != CaptureState::Done {
            self.finalize()?;
            self.state = CaptureState::Done;
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| H17Error::Io(std::io::Error::other("capture output was lost")))?;
        Ok((self.image, sink))
    }

    fn total_tracks(&self) -> usize {
        self.config.sides as usize * self.config.tracks as usize
    }

    /// Side and logical track of the track in progress
    fn position(&self) -> (u8, u8) {
        let sides = self.config.sides as usize;
        (
            (self.track_index % sides) as u8,
            (self.track_index / sides) as u8,
        )
    }

    fn step(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Idle => self.next_track(),
            CaptureState::Seeking => self.seek_track(),
            CaptureState::ReadingSector(sector) => self.read_sector(sector),
            CaptureState::TrackComplete => self.complete_track(),
            CaptureState::Done => Ok(()),
        }
    }

    fn next_track(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            log::info!(
                "Capturing {} side(s), {} tracks with {}",
                self.config.sides,
                self.config.tracks,
                self.device.description()
            );
            self.device.set_density(self.config.density)?;
            self.device.recalibrate()?;
            self.head = Some(0);
        }

        if self.track_index < self.total_tracks() {
            self.state = CaptureState::Seeking;
            return Ok(());
        }

        self.finalize()?;
        let errors = self.image.error_count();
        let tracks = self.image.data().map_or(0, DataBlock::track_count);
        log::info!("Capture finished: {} tracks, {} sector errors", tracks, errors);
        self.events
            .push_back(CaptureEvent::Finished { tracks, errors });
        self.state = CaptureState::Done;
        Ok(())
    }

    fn seek_track(&mut self) -> Result<()> {
        let (side, track) = self.position();
        let physical = self.config.physical_track(track);
        if self.head != Some(physical) {
            self.device.seek(physical)?;
            self.head = Some(physical);
        }

        self.committed.clear();
        self.raw_slots.iter_mut().for_each(|slot| *slot = None);
        self.order_index = 0;
        self.attempt = 0;

        self.events
            .push_back(CaptureEvent::TrackStarted { side, track });
        self.state = CaptureState::ReadingSector(self.config.read_order[0]);
        Ok(())
    }

    fn read_sector(&mut self, sector: u8) -> Result<()> {
        if self.cancel.is_cancelled() {
            return self.cancel_capture();
        }

        let (side, track) = self.position();
        self.attempt += 1;
        self.events.push_back(CaptureEvent::SectorAttempted {
            side,
            track,
            sector,
            attempt: self.attempt,
        });

        let read = self
            .device
            .read_sector(side, track, sector, self.config.bitcell)?;

        let (error, aligned) = match read.status {
            ReadStatus::NoData => (SectorError::HardwareReadFailure, None),
            status => {
                let address = SectorAddress::new(self.config.sides, side, track, sector);
                let decoded = decode_sector(&read.raw, &address);
                log::trace!(
                    "Sector {} raw {} bytes, device decode {} bytes, {}",
                    sector,
                    read.raw.len(),
                    read.processed.len(),
                    decoded.stats
                );
                let error = match status {
                    ReadStatus::Error(code) => {
                        log::debug!("Device status {} for sector {}", code, sector);
                        SectorError::InvalidClockBits
                    }
                    _ => decoded.error,
                };
                if self.config.keep_raw {
                    self.raw_slots[sector as usize] = Some(read.raw);
                }
                (error, Some(decoded.aligned))
            }
        };

        log::debug!(
            "Side {} track {} sector {} attempt {}: {}",
            side,
            track,
            sector,
            self.attempt,
            error
        );

        if error.has_error() && self.attempt < self.config.retries {
            return Ok(());
        }

        let committed = match aligned {
            Some(aligned) => Sector::new(sector, error, aligned),
            None => Sector::empty(sector, SectorError::HardwareReadFailure),
        };
        self.committed.push(committed);
        self.events.push_back(CaptureEvent::SectorResult {
            side,
            track,
            sector,
            error,
            attempts: self.attempt,
        });

        self.attempt = 0;
        self.order_index += 1;
        self.state = match self.config.read_order.get(self.order_index) {
            Some(&next) => CaptureState::ReadingSector(next),
            None => CaptureState::TrackComplete,
        };
        Ok(())
    }

    fn complete_track(&mut self) -> Result<()> {
        let (side, track) = self.position();
        let mut staged = self.take_track();
        let complete = staged.is_complete();
        staged.backfill();
        let errors = staged.error_count();

        self.commit_track(staged)?;
        self.events.push_back(CaptureEvent::TrackComplete {
            side,
            track,
            errors,
            complete,
        });
        self.track_index += 1;
        self.state = CaptureState::Idle;
        Ok(())
    }

    fn cancel_capture(&mut self) -> Result<()> {
        let (side, track) = self.position();
        let sectors = self.flush_partial()?;
        log::info!(
            "Capture cancelled at side {} track {} with {} sectors committed",
            side,
            track,
            sectors
        );
        self.finalize()?;
        self.events.push_back(CaptureEvent::Cancelled {
            side,
            track,
            sectors,
        });
        self.state = CaptureState::Done;
        Ok(())
    }

    /// Write whatever the track in progress has, without backfilling
    fn flush_partial(&mut self) -> Result<usize> {
        let partial = self.take_track();
        let sectors = partial.sector_count();
        if sectors > 0 || self.raw_slots.iter().any(Option::is_some) {
            self.commit_track(partial)?;
        }
        Ok(sectors)
    }

    fn abort(&mut self) {
        if matches!(
            self.state,
            CaptureState::ReadingSector(_) | CaptureState::TrackComplete
        ) {
            if let Err(err) = self.flush_partial() {
                log::warn!("Could not write partial track: {}", err);
            }
        }
        if let Err(err) = self.finalize() {
            log::warn!("Could not finalize capture output: {}", err);
        }
        self.state = CaptureState::Done;
    }

    /// Move the committed sectors into a track
    fn take_track(&mut self) -> Track {
        let (side, track) = self.position();
        let mut staged = Track::new(side, track);
        for sector in self.committed.drain(..) {
            staged.add_sector(sector);
        }
        staged
    }

    /// Write a track and keep it and its raw captures in the model
    fn commit_track(&mut self, track: Track) -> Result<()> {
        let mut raw_track = RawTrack::new(track.side, track.track);
        for (number, slot) in self.raw_slots.iter_mut().enumerate() {
            if let Some(raw) = slot.take() {
                raw_track.add_sector(RawSector::new(number as u8, raw));
            }
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_track(&track)?;
        }
        if !track.is_complete() {
            log::warn!(
                "Side {} track {} written incomplete, missing {:?}",
                track.side,
                track.track,
                track.missing_sectors()
            );
        }
        self.data.add_track(track);
        if !raw_track.is_empty() {
            self.raw.add_track(raw_track);
        }
        Ok(())
    }

    /// Close the Data block, append raw captures and release the sink
    fn finalize(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        self.image.set_data(std::mem::take(&mut self.data));
        if self.config.keep_raw && self.raw.track_count() > 0 {
            self.image.set_raw_data(std::mem::take(&mut self.raw));
        }

        if let Some(pending) = self.data_block.take() {
            writer.end_block(pending)?;
        }
        if let Some(raw) = self.image.get_block(BlockType::RawData) {
            writer.write_block(raw)?;
        }
        self.sink = Some(writer.into_inner()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::{BitcellTiming, Density, SectorRead};
    use crate::image::builder::{format_sector, synthesize_raw};
    use crate::io::read_h17_bytes;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[derive(Debug, Clone, Copy)]
    enum Fault {
        NoData,
        Garbage,
        Status(i32),
    }

    #[derive(Default)]
    struct ScriptedDevice {
        sides: u8,
        faults: HashMap<(u8, u8, u8), Vec<Fault>>,
        reads: usize,
        seeks: Vec<u8>,
        fail_seek: Option<u8>,
    }

    impl ScriptedDevice {
        fn new(sides: u8) -> Self {
            Self {
                sides,
                ..Default::default()
            }
        }

        fn fault(mut self, side: u8, track: u8, sector: u8, faults: &[Fault]) -> Self {
            self.faults.insert((side, track, sector), faults.to_vec());
            self
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn seek(&mut self, physical_track: u8) -> Result<()> {
            if self.fail_seek == Some(physical_track) {
                return Err(H17Error::device("seek", -5));
            }
            self.seeks.push(physical_track);
            Ok(())
        }

        fn recalibrate(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_density(&mut self, _density: Density) -> Result<()> {
            Ok(())
        }

        fn read_sector(
            &mut self,
            side: u8,
            track: u8,
            sector: u8,
            _timing: BitcellTiming,
        ) -> Result<SectorRead> {
            self.reads += 1;
            let address = SectorAddress::new(self.sides, side, track, sector);
            let good = synthesize_raw(&format_sector(&address, 0, &[track ^ sector; 256]));

            let fault = self
                .faults
                .get_mut(&(side, track, sector))
                .filter(|f| !f.is_empty())
                .map(|f| f.remove(0));
            Ok(match fault {
                None => SectorRead::with_raw(good),
                Some(Fault::NoData) => SectorRead::no_data(),
                Some(Fault::Garbage) => SectorRead::with_raw(vec![0xAA; 700]),
                Some(Fault::Status(code)) => SectorRead {
                    raw: good,
                    processed: Vec::new(),
                    status: ReadStatus::Error(code),
                },
            })
        }
    }

    fn drain<D: CaptureDevice>(
        session: &mut CaptureSession<D, Cursor<Vec<u8>>>,
    ) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        while let Some(event) = session.poll().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_clean_capture() {
        let config = CaptureConfig::new().tracks(2);
        let mut session =
            CaptureSession::new(ScriptedDevice::new(1), config, Cursor::new(Vec::new())).unwrap();
        let events = drain(&mut session);

        assert_eq!(
            events.first(),
            Some(&CaptureEvent::TrackStarted { side: 0, track: 0 })
        );
        assert_eq!(
            events.get(1),
            Some(&CaptureEvent::SectorAttempted {
                side: 0,
                track: 0,
                sector: 0,
                attempt: 1
            })
        );
        assert_eq!(
            events.last(),
            Some(&CaptureEvent::Finished {
                tracks: 2,
                errors: 0
            })
        );
        assert_eq!(session.device().reads, 20);
        assert_eq!(session.device().seeks, vec![1]);
        assert_eq!(session.state(), CaptureState::Done);

        let (image, sink) = session.finish().unwrap();
        let read_back = read_h17_bytes(sink.get_ref()).unwrap();
        assert_eq!(read_back.data(), image.data());
        assert_eq!(read_back.raw_data(), image.raw_data());
        assert_eq!(read_back.error_count(), 0);
        assert!(read_back.is_usable());
        assert_eq!(
            read_back.flags().unwrap().track_source,
            TrackSource::CapturedOnModernHardware
        );
        assert!(read_back.text(BlockType::Program).unwrap().starts_with("h17disk"));

        let sector = read_back.get_sector(0, 1, 3).unwrap();
        assert_eq!(sector.user_data(), Some(&[1 ^ 3; 256][..]));
    }

    #[test]
    fn test_sectors_committed_in_read_order() {
        let config = CaptureConfig::new().tracks(1);
        let mut session =
            CaptureSession::new(ScriptedDevice::new(1), config, Cursor::new(Vec::new())).unwrap();
        session.run().unwrap();
        let (image, _) = session.finish().unwrap();

        let numbers: Vec<u8> = image
            .get_track(0, 0)
            .unwrap()
            .sectors()
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, vec![0, 2, 4, 6, 8, 1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_retry_then_success() {
        let faults = [Fault::Garbage; 5];
        let device = ScriptedDevice::new(1).fault(0, 0, 4, &faults);
        let mut session =
            CaptureSession::new(device, CaptureConfig::new().tracks(1), Cursor::new(Vec::new()))
                .unwrap();
        let events = drain(&mut session);

        assert!(events.contains(&CaptureEvent::SectorResult {
            side: 0,
            track: 0,
            sector: 4,
            error: SectorError::NoError,
            attempts: 6
        }));
        assert_eq!(session.device().reads, 15);
        let (image, _) = session.finish().unwrap();
        assert_eq!(image.error_count(), 0);
    }

    #[test]
    fn test_retries_exhausted_keeps_last_result() {
        let device = ScriptedDevice::new(1).fault(0, 0, 7, &[Fault::Garbage; 6]);
        let mut session =
            CaptureSession::new(device, CaptureConfig::new().tracks(1), Cursor::new(Vec::new()))
                .unwrap();
        session.run().unwrap();
        let (image, _) = session.finish().unwrap();

        let sector = image.get_sector(0, 0, 7).unwrap();
        assert_eq!(sector.error, SectorError::MissingHeaderSync);
        assert_eq!(sector.size(), crate::format::ALIGNED_SECTOR_SIZE);
        let raw = image.raw_data().unwrap().get_track(0, 0).unwrap();
        assert_eq!(raw.get_sector(7).unwrap().data(), &[0xAA; 700][..]);
    }

    #[test]
    fn test_final_attempt_no_data() {
        let faults = [
            Fault::Garbage,
            Fault::Garbage,
            Fault::Garbage,
            Fault::Garbage,
            Fault::Garbage,
            Fault::NoData,
        ];
        let device = ScriptedDevice::new(1).fault(0, 0, 1, &faults);
        let mut session =
            CaptureSession::new(device, CaptureConfig::new().tracks(1), Cursor::new(Vec::new()))
                .unwrap();
        session.run().unwrap();
        let (image, _) = session.finish().unwrap();

        let sector = image.get_sector(0, 0, 1).unwrap();
        assert_eq!(sector.error, SectorError::HardwareReadFailure);
        assert_eq!(sector.size(), 0);
        // the earlier capture is still kept for reprocessing
        let raw = image.raw_data().unwrap().get_track(0, 0).unwrap();
        assert!(raw.get_sector(1).is_some());
    }

    #[test]
    fn test_device_status_is_clock_error() {
        let device = ScriptedDevice::new(1).fault(0, 0, 0, &[Fault::Status(3); 6]);
        let config = CaptureConfig::new().tracks(1).retries(6);
        let mut session = CaptureSession::new(device, config, Cursor::new(Vec::new())).unwrap();
        session.run().unwrap();
        let (image, _) = session.finish().unwrap();
        assert_eq!(
            image.get_sector(0, 0, 0).unwrap().error,
            SectorError::InvalidClockBits
        );
    }

    #[test]
    fn test_double_sided_double_step() {
        let config = CaptureConfig::new().sides(2).tracks(2).double_step(true);
        let mut session =
            CaptureSession::new(ScriptedDevice::new(2), config, Cursor::new(Vec::new())).unwrap();
        let events = drain(&mut session);

        let started: Vec<(u8, u8)> = events
            .iter()
            .filter_map(|e| match e {
                CaptureEvent::TrackStarted { side, track } => Some((*side, *track)),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(session.device().seeks, vec![2]);

        let (image, _) = session.finish().unwrap();
        assert_eq!(image.error_count(), 0);
        assert_eq!(image.data().unwrap().track_count(), 4);
    }

    #[test]
    fn test_cancel_writes_partial_track() {
        let mut session =
            CaptureSession::new(ScriptedDevice::new(1), CaptureConfig::new().tracks(3), Cursor::new(Vec::new()))
                .unwrap();
        let handle = session.cancel_handle();

        let mut results = 0;
        let mut cancelled = None;
        while let Some(event) = session.poll().unwrap() {
            match event {
                CaptureEvent::SectorResult { track: 1, .. } => {
                    results += 1;
                    if results == 4 {
                        handle.cancel();
                    }
                }
                CaptureEvent::Cancelled { .. } => cancelled = Some(event),
                _ => {}
            }
        }

        assert_eq!(
            cancelled,
            Some(CaptureEvent::Cancelled {
                side: 0,
                track: 1,
                sectors: 4
            })
        );
        let (image, sink) = session.finish().unwrap();
        let read_back = read_h17_bytes(sink.get_ref()).unwrap();
        assert_eq!(read_back.data(), image.data());
        let partial = read_back.get_track(0, 1).unwrap();
        assert_eq!(partial.sector_count(), 4);
        assert!(!partial.is_complete());
        assert_eq!(read_back.raw_data().unwrap().get_track(0, 1).unwrap().sector_count(), 4);
        assert!(read_back.get_track(0, 2).is_err());
    }

    #[test]
    fn test_seek_failure_finalizes_output() {
        let mut device = ScriptedDevice::new(1);
        device.fail_seek = Some(2);
        let mut session =
            CaptureSession::new(device, CaptureConfig::new().tracks(4), Cursor::new(Vec::new()))
                .unwrap();

        let err = loop {
            match session.poll() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("capture should fail"),
                Err(err) => break err,
            }
        };
        assert!(matches!(err, H17Error::Device { operation: "seek", .. }));
        assert_eq!(session.state(), CaptureState::Done);
        assert!(session.poll().unwrap().is_none());

        let (_, sink) = session.finish().unwrap();
        let read_back = read_h17_bytes(sink.get_ref()).unwrap();
        assert_eq!(read_back.data().unwrap().track_count(), 2);
        assert_eq!(read_back.raw_data().unwrap().track_count(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = CaptureSession::new(
            ScriptedDevice::new(1),
            CaptureConfig::new().sides(0),
            Cursor::new(Vec::new()),
        );
        assert!(matches!(result, Err(H17Error::InvalidConfig(_))));
    }

    #[test]
    fn test_event_display() {
        let event = CaptureEvent::SectorResult {
            side: 0,
            track: 3,
            sector: 2,
            error: SectorError::WrongTrack,
            attempts: 6,
        };
        assert_eq!(
            event.to_string(),
            "Side 0 track  3 sector 2: Wrong track after 6 attempt(s)"
        );
    }
}
