use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

use tracer_kinematics::MotionCommand;
use tracer_motion::Rgb;

use crate::sim::SimPose;

/// Read-only view of the control loop after one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub rgb: Rgb,
    pub range_cm: i16,
    pub gyro_angle: i16,
    pub distance: f64,
    pub heading: f64,
    pub speed: f64,
    /// Last command handed to the steering mapper.
    pub command: MotionCommand,
    /// Command recovered from the reported wheel powers.
    pub reported: MotionCommand,
    pub mission: String,
    pub phase: String,
}

#[derive(Clone, Default)]
pub struct State {
    pub telemetry: Telemetry,
    /// Ground truth from the simulator.
    pub pose: SimPose,
    /// Most recent stretch of the path travelled, for drawing.
    pub trail: VecDeque<SimPose>,
    pub running: bool,
    pub faults: Vec<String>,
}

pub type Blackboard = Arc<RwLock<State>>;

/// Keep every this many ticks in the trail.
const TRAIL_STRIDE: u64 = 10;
/// Oldest trail points are dropped beyond this many.
const TRAIL_LIMIT: usize = 2_000;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn publish(bb: &Blackboard, telemetry: &Telemetry, pose: SimPose) {
    let mut g = bb.write();
    if telemetry.tick % TRAIL_STRIDE == 0 {
        if g.trail.len() >= TRAIL_LIMIT {
            g.trail.pop_front();
        }
        g.trail.push_back(pose);
    }
    g.telemetry.clone_from(telemetry);
    g.pose = pose;
}

pub fn set_running(bb: &Blackboard, running: bool) {
    bb.write().running = running;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_snapshot() {
        let bb: Blackboard = Arc::default();
        let telemetry = Telemetry {
            tick: 20,
            phase: "trace".to_string(),
            ..Default::default()
        };
        let pose = SimPose {
            x: 1.0,
            y: 2.0,
            heading: 3.0,
        };
        publish(&bb, &telemetry, pose);
        publish(&bb, &Telemetry { tick: 21, ..telemetry.clone() }, pose);
        let state = snapshot(&bb);
        assert_eq!(state.telemetry.tick, 21);
        assert_eq!(state.telemetry.phase, "trace");
        assert_eq!(state.pose, pose);
        assert_eq!(state.trail.len(), 1);
    }

    #[test]
    fn test_trail_is_bounded() {
        let bb: Blackboard = Arc::default();
        let stride = TRAIL_STRIDE as usize;
        for tick in 1..=(TRAIL_LIMIT + 5) * stride {
            let pose = SimPose {
                x: tick as f64,
                ..Default::default()
            };
            publish(&bb, &Telemetry { tick: tick as u64, ..Default::default() }, pose);
        }
        let trail = snapshot(&bb).trail;
        assert_eq!(trail.len(), TRAIL_LIMIT);
        // The five oldest points were dropped; the newest is the last published.
        assert_eq!(trail.front().map(|p| p.x), Some((6 * stride) as f64));
        assert_eq!(trail.back().map(|p| p.x), Some(((TRAIL_LIMIT + 5) * stride) as f64));
    }

    #[test]
    fn test_faults_are_deduplicated() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "operator abort");
        raise_fault(&bb, "operator abort");
        assert_eq!(snapshot(&bb).faults, ["operator abort"]);
    }
}
