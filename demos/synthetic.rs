//! Scripted two-object scene: lock onto a moving target by tapping it,
//! watch the slot survive a dropout and recall the target on re-entry.
//!
//! Run with `cargo run --example synthetic`.

use anyhow::Result;
use ndarray::Array3;

use tracklock::{Config, Detection, Frame, SharedEngine};

const DIMS: (u32, u32) = (640, 480);

fn paint(regions: &[([f32; 4], [u8; 3])]) -> Array3<u8> {
    let mut img = Array3::from_elem((DIMS.1 as usize, DIMS.0 as usize, 3), 96u8);

    for &(bbox, rgb) in regions {
        let x1 = bbox[0].max(0.0) as usize;
        let y1 = bbox[1].max(0.0) as usize;
        let x2 = (bbox[2] as usize).min(DIMS.0 as usize);
        let y2 = (bbox[3] as usize).min(DIMS.1 as usize);

        for y in y1..y2 {
            for x in x1..x2 {
                for c in 0..3 {
                    img[[y, x, c]] = rgb[c];
                }
            }
        }
    }

    img
}

fn walker(step: u32) -> [f32; 4] {
    let x = 40.0 + step as f32 * 12.0;

    [x, 200.0, x + 60.0, 320.0]
}

fn print_state(step: u32, engine: &SharedEngine) {
    let tracks: Vec<String> = engine
        .tracks()
        .iter()
        .map(|t| format!("#{}(lost={})", t.id, t.lost))
        .collect();

    let slots: Vec<String> = engine
        .slots()
        .iter()
        .map(|s| match s.track {
            Some(id) => format!("[{}]=#{}", s.slot, id),
            None if s.last_seen.is_some() => format!("[{}]=?", s.slot),
            None => format!("[{}]=-", s.slot),
        })
        .collect();

    println!(
        "cycle {:2}  tracks: {:<28}  slots: {}",
        step,
        tracks.join(" "),
        slots.join(" ")
    );
}

fn main() -> Result<()> {
    let engine = SharedEngine::new(Config {
        max_lost: 3,
        ..Config::default()
    });

    let bystander = [480.0, 60.0, 560.0, 180.0];
    let red = [230, 40, 40];
    let gray = [170, 170, 170];

    for step in 0..24u32 {
        let ts = step as f64 * 0.1;

        // the target drops out of the detector's output for a stretch long
        // enough to expire its track, then re-enters further along its path
        let target_visible = !(9..15).contains(&step);

        let mut regions = vec![(bystander, gray)];
        let mut detections = vec![Detection::try_new(bystander, 0, 0.74)?];

        if target_visible {
            let bbox = walker(step);
            regions.push((bbox, red));
            detections.push(Detection::try_new(bbox, 0, 0.91)?);
        }

        let img = paint(&regions);
        let frame = Frame::try_new(DIMS, ts, detections)?;
        engine.process_frame(&frame, Some(&img.view()));

        if step == 4 {
            // tap the middle of the walker
            let bbox = walker(step);
            let nx = (bbox[0] + bbox[2]) / 2.0 / DIMS.0 as f32;
            let ny = (bbox[1] + bbox[3]) / 2.0 / DIMS.1 as f32;

            match engine.toggle_at_point(nx, ny) {
                Some(outcome) => println!("tap at ({:.2}, {:.2}) -> {:?}", nx, ny, outcome),
                None => println!("tap missed"),
            }
        }

        print_state(step, &engine);
    }

    println!("final slots: {:?}", engine.slots());
    engine.delete_slot(1);
    println!("after delete: {:?}", engine.slots());

    Ok(())
}
