//! Program reuse across calls and threads, backend faults, and per-context
//! parameter overrides.

use std::time::Duration;

use gllm_blas::api;
use gllm_blas::database::DatabaseError;
use gllm_blas::host::{CommandKind, HostBackend};
use gllm_blas::routines::Xaxpy;
use gllm_blas::{BlasConfig, CallState, Context, DeviceInfo, DeviceType, ParameterSet, Precision, StatusCode};

fn params(pairs: &[(&str, usize)]) -> ParameterSet {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

fn last_launch(ctx: &Context<HostBackend>) -> (String, Vec<usize>) {
    let record = ctx.backend().launches().pop().unwrap();
    match record.command {
        CommandKind::Kernel(name) => (name, record.global),
        CommandKind::Copy { .. } => panic!("expected a kernel launch"),
    }
}

fn axpy_checked(ctx: &Context<HostBackend>, n: usize) {
    let x: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let y: Vec<f32> = (0..n).map(|i| (i % 7) as f32).collect();
    let xb = ctx.backend().upload(&x);
    let yb = ctx.backend().upload(&y);
    api::axpy(ctx, n, 0.5f32, &xb, 0, 1, &yb, 0, 1).unwrap();
    let out = ctx.backend().download(&yb).unwrap();
    for i in 0..n {
        assert_eq!(out[i], 0.5 * x[i] + y[i], "index {i}");
    }
}

#[test]
fn concurrent_routines_compile_once() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    ctx.backend().set_compile_delay(Duration::from_millis(50));
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let axpy = Xaxpy::<f32, _>::new(&ctx).unwrap();
                axpy.routine().program().unwrap();
                assert_eq!(axpy.routine().state(), CallState::ProgramReady);
            });
        }
    });
    assert_eq!(ctx.backend().compilations(), 1);
    assert_eq!(ctx.cache().len(), 1);
}

#[test]
fn repeated_calls_reuse_the_program() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    for _ in 0..3 {
        axpy_checked(&ctx, 100);
    }
    assert_eq!(ctx.backend().compilations(), 1);
    assert_eq!(ctx.backend().launches().len(), 3);
}

#[test]
fn precisions_get_separate_programs() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    axpy_checked(&ctx, 16);
    let x = ctx.backend().upload(&[1.0f64, 2.0]);
    let y = ctx.backend().upload(&[1.0f64, 1.0]);
    api::axpy(&ctx, 2, 2.0f64, &x, 0, 1, &y, 0, 1).unwrap();
    assert_eq!(ctx.backend().download(&y).unwrap(), vec![3.0, 5.0]);
    assert_eq!(ctx.cache().len(), 2);
}

#[test]
fn failed_compilation_is_not_cached() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    ctx.backend().set_fail_compile(true);
    let x = ctx.backend().upload(&[1.0f32; 4]);
    let y = ctx.backend().upload(&[0.0f32; 4]);
    assert_eq!(api::axpy(&ctx, 4, 1.0f32, &x, 0, 1, &y, 0, 1).err(), Some(StatusCode::InvalidKernel));
    assert!(ctx.cache().is_empty());
    assert!(ctx.backend().launches().is_empty());

    ctx.backend().set_fail_compile(false);
    api::axpy(&ctx, 4, 1.0f32, &x, 0, 1, &y, 0, 1).unwrap();
    assert_eq!(ctx.backend().download(&y).unwrap(), vec![1.0; 4]);
    assert_eq!(ctx.cache().len(), 1);
    assert_eq!(ctx.backend().compilations(), 2);
}

#[test]
fn compiler_panic_becomes_invalid_kernel() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    ctx.backend().set_panic_on_compile(true);
    let axpy = Xaxpy::<f32, _>::new(&ctx).unwrap();
    assert_eq!(axpy.routine().program().err(), Some(StatusCode::InvalidKernel));
    assert_eq!(axpy.routine().state(), CallState::Failed);
    assert!(ctx.cache().is_empty());

    ctx.backend().set_panic_on_compile(false);
    axpy_checked(&ctx, 8);
}

#[test]
fn launch_panic_becomes_invalid_kernel() {
    let ctx = Context::new(HostBackend::new()).unwrap();
    ctx.backend().set_panic_on_launch(true);
    let x = ctx.backend().upload(&[1.0f32; 4]);
    let y = ctx.backend().upload(&[0.0f32; 4]);
    assert_eq!(api::axpy(&ctx, 4, 1.0f32, &x, 0, 1, &y, 0, 1).err(), Some(StatusCode::InvalidKernel));
    // the program itself compiled fine and stays cached
    assert_eq!(ctx.cache().len(), 1);

    ctx.backend().set_panic_on_launch(false);
    axpy_checked(&ctx, 4);
}

#[test]
fn override_must_match_the_entry_keys() {
    let mut ctx = Context::new(HostBackend::new()).unwrap();
    assert!(matches!(
        ctx.override_parameters("Xaxpy", Precision::Single, params(&[("WGS", 64), ("WPT", 2)])),
        Err(DatabaseError::OverrideMismatch { .. })
    ));
    assert!(matches!(
        ctx.override_parameters("Xdot", Precision::Half, params(&[("WGS1", 64), ("WGS2", 32)])),
        Err(DatabaseError::UnknownEntry { .. })
    ));
    assert!(!ctx.clear_override("Xaxpy", Precision::Single));

    // names beyond the entry's own are kept
    ctx.override_parameters("Xaxpy", Precision::Single, params(&[("WGS", 64), ("WPT", 2), ("VW", 1), ("X", 1)]))
        .unwrap();
    assert_eq!(Xaxpy::<f32, _>::new(&ctx).unwrap().routine().parameters().get("X"), Some(1));
    axpy_checked(&ctx, 100);
    assert!(ctx.clear_override("Xaxpy", Precision::Single));
}

#[test]
fn zero_override_is_rejected_and_calls_keep_working() {
    let mut ctx = Context::new(HostBackend::new()).unwrap();
    let err = ctx
        .override_parameters("Xaxpy", Precision::Single, params(&[("WGS", 0), ("WPT", 1), ("VW", 1)]))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ZeroParameter { ref name, .. } if name == "WGS"));
    assert!(!ctx.clear_override("Xaxpy", Precision::Single));

    axpy_checked(&ctx, 1000);
    assert_eq!(last_launch(&ctx), ("Xaxpy".to_string(), vec![1024]));
}

#[test]
fn override_changes_parameters_and_cache_key() {
    let mut ctx = Context::new(HostBackend::new()).unwrap();
    axpy_checked(&ctx, 1000);
    assert_eq!(last_launch(&ctx), ("Xaxpy".to_string(), vec![1024]));

    ctx.override_parameters("Xaxpy", Precision::Single, params(&[("WGS", 64), ("WPT", 2), ("VW", 1)]))
        .unwrap();
    assert_eq!(Xaxpy::<f32, _>::new(&ctx).unwrap().routine().parameters().get("WGS"), Some(64));
    axpy_checked(&ctx, 1000);
    // ceil(1000, 64 * 2) / 2
    assert_eq!(last_launch(&ctx), ("Xaxpy".to_string(), vec![512]));
    assert_eq!(ctx.cache().len(), 2);

    // other precisions keep the database values
    let d = Xaxpy::<f64, _>::new(&ctx).unwrap();
    assert_eq!(d.routine().parameters().get("WGS"), Some(128));

    assert!(ctx.clear_override("Xaxpy", Precision::Single));
    axpy_checked(&ctx, 1000);
    assert_eq!(ctx.cache().len(), 2);
    assert_eq!(ctx.backend().compilations(), 2);
}

#[test]
fn device_specific_parameters_pick_the_vector_width() {
    let device = DeviceInfo::new(DeviceType::Gpu, "NVIDIA Corporation", "Tesla K40m", 1024);
    let ctx = Context::new(HostBackend::with_device(device)).unwrap();
    let axpy = Xaxpy::<f32, _>::new(&ctx).unwrap();
    assert_eq!(axpy.routine().parameters().get("VW"), Some(4));

    axpy_checked(&ctx, 1024);
    assert_eq!(last_launch(&ctx), ("XaxpyFast".to_string(), vec![256]));

    let host = Context::new(HostBackend::new()).unwrap();
    axpy_checked(&host, 1024);
    assert_eq!(last_launch(&host), ("XaxpyFast".to_string(), vec![1024]));
}

#[test]
fn contexts_do_not_share_programs() {
    let a = Context::new(HostBackend::new()).unwrap();
    let b = Context::new(HostBackend::new()).unwrap();
    axpy_checked(&a, 32);
    axpy_checked(&b, 32);
    assert_eq!(a.backend().compilations(), 1);
    assert_eq!(b.backend().compilations(), 1);
}

#[test]
fn disabled_fast_kernels_use_the_generic_path() {
    let config = BlasConfig { database_dir: None, disable_fast_kernels: true };
    let ctx = Context::with_config(HostBackend::new(), config).unwrap();
    axpy_checked(&ctx, 1024);
    assert_eq!(last_launch(&ctx), ("Xaxpy".to_string(), vec![1024]));
}
