//! # Swerve Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use robot_lib::drivetrain::{
    ChassisSpeeds, Drivetrain, ModulePosition, Params, Pose2D, SwerveKinematics, SwerveOdometry,
    NUM_MODULES,
};

fn swerve_benchmark(c: &mut Criterion) {
    let params: Params =
        util::params::parse(include_str!("../../params/drivetrain.toml")).unwrap();
    let kin = SwerveKinematics::new(&params.module_pos_m_rb).unwrap();

    // A demand which saturates the modules, so desaturation has work to do
    let speeds = ChassisSpeeds::from_field_relative(3.5, -2.0, 4.0, 0.7);
    let current_angles = [0.3, -2.9, 1.4, 3.0];

    // Inverse kinematics, desaturation and optimisation, as done for every drive demand
    c.bench_function("SwerveKinematics::demand", |b| {
        b.iter(|| {
            let mut states = kin.to_module_states(black_box(&speeds));
            let factor = SwerveKinematics::desaturate(&mut states, params.max_module_speed_ms);
            for (s, a) in states.iter_mut().zip(current_angles.iter()) {
                *s = s.optimise(*a);
            }
            (states, factor)
        })
    });

    // Forward kinematics and pose integration, as done every periodic call
    let mut odometry = SwerveOdometry::new(Pose2D::default(), &[ModulePosition::default(); NUM_MODULES]);
    let mut distance_m = 0.0;
    c.bench_function("SwerveOdometry::update", |b| {
        b.iter(|| {
            distance_m += 0.01;
            let positions = [ModulePosition::new(distance_m, 0.2); NUM_MODULES];
            odometry.update(&kin, black_box(Some(0.1)), &positions)
        })
    });

    // The whole drivetrain on loopback equipment
    let (mut drivetrain, _rig) = Drivetrain::loopback(params.clone(), 0.02).unwrap();
    c.bench_function("Drivetrain::drive", |b| {
        b.iter(|| {
            drivetrain
                .drive(black_box(1.2), black_box(0.4), black_box(0.8), true, true)
                .unwrap()
        })
    });
}

criterion_group!(benches, swerve_benchmark);
criterion_main!(benches);
