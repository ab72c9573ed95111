use s100_devices::boards::D7aBoard;
use s100_devices::bus::ManualClock;
use s100_devices::config::D7aConfig;
use s100_devices::recording::{RecordEntry, Recorder, SampleStatus};
use std::sync::Arc;

#[test]
fn wav_header_and_samples_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("log.wav");

    let mut recorder = Recorder::with_limit(2, 16, 22_050).expect("recorder");
    let left = [0i16, 256, -256, 32_512, -32_768];
    for (tick, &sample) in left.iter().enumerate() {
        recorder.record(
            0,
            RecordEntry {
                tick: tick as u64,
                occupancy: 1,
                sample,
                status: SampleStatus::Ok,
            },
        );
    }
    recorder.record(
        1,
        RecordEntry {
            sample: 1024,
            ..RecordEntry::default()
        },
    );
    recorder.export_wav(&path).expect("export");

    let mut reader = hound::WavReader::open(&path).expect("open");
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.duration(), 5);

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .expect("decode");
    let decoded_left: Vec<i16> = samples.iter().step_by(2).copied().collect();
    let decoded_right: Vec<i16> = samples.iter().skip(1).step_by(2).copied().collect();
    assert_eq!(decoded_left, left);
    // Shorter channel padded with silence
    assert_eq!(decoded_right, vec![1024, 0, 0, 0, 0]);
}

#[test]
fn d7a_recording_matches_written_levels() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("d7a.wav");
    let config = D7aConfig {
        sample_rate: 20_000,
        sync_adjust: 1.0,
        soundfile: Some(path.clone()),
        ..D7aConfig::default()
    };
    let clock = Arc::new(ManualClock::new(4_000_000));
    let board = D7aBoard::new(config, clock.clone()).expect("board");

    // One sample per write on channel 1 (port 3)
    board.port_out(3, 0);
    let levels = [10u8, 20, 0xf6, 0x80, 0x7f];
    for &level in &levels {
        clock.advance(200);
        board.port_out(3, level);
    }
    board.shutdown().expect("shutdown");

    let mut reader = hound::WavReader::open(&path).expect("open");
    assert_eq!(reader.spec().sample_rate, 20_000);
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .expect("decode");
    let right: Vec<i16> = samples.iter().skip(1).step_by(2).copied().collect();
    let expected: Vec<i16> = levels.iter().map(|&l| (l as i8 as i16) * 256).collect();
    assert_eq!(right, expected);
}
