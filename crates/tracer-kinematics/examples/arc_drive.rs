use tracer_kinematics::*;

fn main() {
    let wheel_diameter = 100.0; // mm
    let tread = 145.0; // mm
    let degrees_per_tick = 1.0;
    let odometry_result = Odometry::new(wheel_diameter, tread, degrees_per_tick);

    let mapper = SteeringMapper::new(CourseOrientation::Left);
    let (command, wheels) = mapper.steer(60, 30); // gentle right arc
    let degrees_per_power = 0.032; // wheel degrees per tick at power 1
    let num_steps = 10;

    match odometry_result {
        Ok(mut odometry) => {
            println!("Initializing drive...");
            println!("  Drive Parameters:");
            println!("    Wheel Diameter: {} mm", odometry.wheel_diameter());
            println!("    Tread:          {} mm", odometry.tread());
            println!("  Command:");
            println!("    Steering:       {}", command);
            println!("    Wheels:         {}", wheels);
            println!("
Driving...");

            odometry.init(EncoderSample::new(0, 0));
            let (mut left, mut right) = (0.0, 0.0);
            for i in 0..num_steps {
                left += f64::from(wheels.left.power()) * degrees_per_power * 10.0;
                right += f64::from(wheels.right.power()) * degrees_per_power * 10.0;
                let state = odometry.update(EncoderSample::new(left as i32, right as i32));
                println!("Step {:>2}: {}", i + 1, state);
            }

            println!("
Drive complete.");
            println!("Final: {}", odometry);
        }
        Err(e) => {
            eprintln!("Failed to initialize odometry: {:?}", e);
            eprintln!(
                "Please ensure wheel_diameter ({}), tread ({}) and degrees_per_tick ({}) are positive.",
                wheel_diameter, tread, degrees_per_tick
            );
        }
    }
}
