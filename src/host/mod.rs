//! Host reference backend.
//!
//! Runs every kernel the routines launch on the CPU, with the same argument
//! order and launch geometry a device backend would receive. Commands either
//! run as they are enqueued or are queued until waited on, which lets tests
//! observe the dependency chains between the stages of a routine.

pub mod element;
mod kernels;

use std::borrow::Cow;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

pub use element::{HostData, HostElement};

use crate::database::DeviceType;
use crate::runtime::{Backend, Buffer, DeviceInfo, KernelArg, RuntimeError, RuntimeResult};
use crate::types::Precision;
use kernels::HostArg;

static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One host allocation. Clones share the same storage.
#[derive(Clone)]
pub struct HostMemory {
    id: u64,
    data: Arc<RwLock<HostData>>,
}

impl HostMemory {
    fn new(data: HostData) -> Self {
        HostMemory {
            id: NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed),
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn precision(&self) -> Precision {
        self.data.read().unwrap_or_else(PoisonError::into_inner).precision()
    }

    /// Length in elements.
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cloned(&self) -> HostData {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Copy of the contents as `T`.
    pub fn snapshot<T: HostElement>(&self) -> RuntimeResult<Vec<T>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        T::view(&data).map(<[T]>::to_vec).ok_or_else(|| self.mismatch::<T>(data.precision()))
    }

    /// Runs `f` on the contents as `T` under the write lock.
    pub fn update<T: HostElement, R>(&self, f: impl FnOnce(&mut [T]) -> RuntimeResult<R>) -> RuntimeResult<R> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let actual = data.precision();
        match T::view_mut(&mut data) {
            Some(values) => f(values),
            None => Err(self.mismatch::<T>(actual)),
        }
    }

    fn mismatch<T: HostElement>(&self, actual: Precision) -> RuntimeError {
        RuntimeError::InvalidArgument(format!(
            "buffer {} holds {actual} elements, kernel expects {}",
            self.id,
            T::PRECISION
        ))
    }
}

impl fmt::Debug for HostMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMemory")
            .field("id", &self.id)
            .field("precision", &self.precision())
            .field("len", &self.len())
            .finish()
    }
}

/// What a compiled program knows from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    precision: Precision,
    defines: BTreeMap<String, Option<usize>>,
    kernels: Vec<String>,
}

impl ProgramInfo {
    /// Parses the `#define` lines and the `//! kernels:` list of `source`.
    pub fn parse(source: &str) -> RuntimeResult<Self> {
        let mut defines = BTreeMap::new();
        let mut kernels = Vec::new();
        for line in source.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("#define ") {
                let mut parts = rest.split_whitespace();
                let Some(name) = parts.next() else {
                    return Err(RuntimeError::Compile("empty #define".to_string()));
                };
                let value = match parts.next() {
                    Some(v) => Some(
                        v.parse::<usize>()
                            .map_err(|_| RuntimeError::Compile(format!("non-numeric value for {name}: {v}")))?,
                    ),
                    None => None,
                };
                defines.insert(name.to_string(), value);
            } else if let Some(list) = line.strip_prefix("//! kernels:") {
                kernels.extend(list.split_whitespace().map(str::to_string));
            }
        }

        let precision = defines
            .get("PRECISION")
            .copied()
            .flatten()
            .and_then(|v| u32::try_from(v).ok())
            .and_then(Precision::from_define_value)
            .ok_or_else(|| RuntimeError::Compile("missing or unknown PRECISION".to_string()))?;
        if kernels.is_empty() {
            return Err(RuntimeError::Compile("program declares no kernels".to_string()));
        }
        Ok(ProgramInfo { precision, defines, kernels })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Name of the `ROUTINE_*` marker, without the prefix.
    pub fn routine(&self) -> Option<&str> {
        self.defines.keys().find_map(|k| k.strip_prefix("ROUTINE_"))
    }

    pub fn kernels(&self) -> &[String] {
        &self.kernels
    }

    pub fn has_define(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Numeric value of define `key`.
    pub fn param(&self, key: &str) -> RuntimeResult<usize> {
        self.defines
            .get(key)
            .copied()
            .flatten()
            .ok_or_else(|| RuntimeError::Execution(format!("program has no value for {key}")))
    }
}

#[derive(Debug, Clone)]
pub struct HostProgram {
    info: Arc<ProgramInfo>,
}

impl HostProgram {
    pub fn info(&self) -> &ProgramInfo {
        &self.info
    }
}

#[derive(Debug, Clone)]
pub struct HostKernel {
    name: String,
    program: Arc<ProgramInfo>,
}

impl HostKernel {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Complete,
    Failed(String),
}

/// Completion handle of one enqueued command.
#[derive(Debug, Clone)]
pub struct HostEvent {
    id: u64,
    status: Arc<Mutex<EventStatus>>,
}

impl HostEvent {
    fn new(id: u64) -> Self {
        HostEvent { id, status: Arc::new(Mutex::new(EventStatus::Pending)) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> EventStatus {
        lock(&self.status).clone()
    }

    fn set(&self, status: EventStatus) {
        *lock(&self.status) = status;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Commands run inside the enqueue call.
    #[default]
    Immediate,
    /// Commands run in enqueue order on `wait` or `finish`.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Kernel(String),
    Copy { len: usize },
}

/// One enqueued command, as recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub sequence: usize,
    pub command: CommandKind,
    pub global: Vec<usize>,
    pub local: Vec<usize>,
    /// Event ids of the wait list.
    pub wait_for: Vec<u64>,
    pub event: u64,
    /// Element count of every buffer argument, in argument order.
    pub buffers: Vec<usize>,
}

type Work = Box<dyn FnOnce() -> RuntimeResult<()> + Send>;

struct Command {
    event: HostEvent,
    wait_for: Vec<HostEvent>,
    work: Work,
}

#[derive(Default)]
struct Faults {
    fail_compile: AtomicBool,
    panic_on_compile: AtomicBool,
    panic_on_launch: AtomicBool,
}

/// Program sources known to the host backend, keyed by program name.
const SOURCES: &[(&str, &str)] = &[
    ("level1/xcopy", "//! kernels: Xcopy XcopyFast\n"),
    ("level1/xswap", "//! kernels: Xswap XswapFast\n"),
    ("level1/xscal", "//! kernels: Xscal XscalFast\n"),
    ("level1/xaxpy", "//! kernels: Xaxpy XaxpyFast\n"),
    ("level1/xrot", "//! kernels: Xrot XrotFast\n"),
    ("level1/xdot", "//! kernels: Xdot XdotEpilogue\n"),
    ("level1/xnrm2", "//! kernels: Xnrm2 Xnrm2Epilogue\n"),
    ("level1/xasum", "//! kernels: Xasum XasumEpilogue\n"),
    ("level2/xgemv", "//! kernels: Xgemv XgemvFast XgemvFastRot\n"),
    ("level2/xger", "//! kernels: Xger\n"),
    ("level2/xher", "//! kernels: Xher\n"),
    ("level2/xtpsv", "//! kernels: Xtpsv\n"),
    ("levelx/copy", "//! kernels: CopyMatrixFast CopyMatrix\n"),
];

/// CPU implementation of [`Backend`].
pub struct HostBackend {
    device: DeviceInfo,
    mode: ExecutionMode,
    queue: Mutex<VecDeque<Command>>,
    drain: Mutex<()>,
    next_event: AtomicU64,
    launches: Mutex<Vec<LaunchRecord>>,
    completed: Mutex<Vec<u64>>,
    compilations: AtomicUsize,
    compile_delay: Mutex<Duration>,
    faults: Faults,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    pub fn new() -> Self {
        Self::with_mode(Self::default_device(), ExecutionMode::Immediate)
    }

    pub fn deferred() -> Self {
        Self::with_mode(Self::default_device(), ExecutionMode::Deferred)
    }

    /// Reports `device` to the tuning database instead of the host device.
    pub fn with_device(device: DeviceInfo) -> Self {
        Self::with_mode(device, ExecutionMode::Immediate)
    }

    pub fn with_mode(device: DeviceInfo, mode: ExecutionMode) -> Self {
        HostBackend {
            device,
            mode,
            queue: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
            next_event: AtomicU64::new(1),
            launches: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            compilations: AtomicUsize::new(0),
            compile_delay: Mutex::new(Duration::ZERO),
            faults: Faults::default(),
        }
    }

    pub fn default_device() -> DeviceInfo {
        DeviceInfo::new(DeviceType::Cpu, "gllm", "host reference", 1024)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// New buffer holding `values`.
    pub fn upload<T: HostElement>(&self, values: &[T]) -> Buffer<T, Self> {
        Buffer::from_memory(self, HostMemory::new(T::into_data(values.to_vec())))
    }

    /// Contents of `buffer` once every queued command has run.
    pub fn download<T: HostElement>(&self, buffer: &Buffer<T, Self>) -> RuntimeResult<Vec<T>> {
        self.finish()?;
        buffer.memory().snapshot()
    }

    /// Every command enqueued so far, in enqueue order.
    pub fn launches(&self) -> Vec<LaunchRecord> {
        lock(&self.launches).clone()
    }

    /// Forgets the launch and completion history.
    pub fn clear_launches(&self) {
        lock(&self.launches).clear();
        lock(&self.completed).clear();
    }

    /// Event ids in the order their commands completed.
    pub fn completed_events(&self) -> Vec<u64> {
        lock(&self.completed).clone()
    }

    /// Number of successful and failed `compile` calls.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    pub fn set_compile_delay(&self, delay: Duration) {
        *lock(&self.compile_delay) = delay;
    }

    pub fn set_fail_compile(&self, fail: bool) {
        self.faults.fail_compile.store(fail, Ordering::SeqCst);
    }

    pub fn set_panic_on_compile(&self, panic: bool) {
        self.faults.panic_on_compile.store(panic, Ordering::SeqCst);
    }

    pub fn set_panic_on_launch(&self, panic: bool) {
        self.faults.panic_on_launch.store(panic, Ordering::SeqCst);
    }

    fn check_geometry(&self, global: &[usize], local: &[usize]) -> RuntimeResult<()> {
        let fail = |msg: String| Err(RuntimeError::InvalidGeometry(msg));
        if global.is_empty() || global.len() > 3 || global.len() != local.len() {
            return fail(format!("global {global:?} and local {local:?} must both have 1 to 3 dimensions"));
        }
        for (dim, (&g, &l)) in global.iter().zip(local).enumerate() {
            if l == 0 {
                return fail(format!("local size is zero in dimension {dim}"));
            }
            if g % l != 0 {
                return fail(format!("global size {g} is not a multiple of local size {l} in dimension {dim}"));
            }
        }
        let group: usize = local.iter().product();
        if group > self.device.max_work_group_size {
            return fail(format!("work-group of {group} exceeds device limit {}", self.device.max_work_group_size));
        }
        Ok(())
    }

    fn submit(
        &self,
        command: CommandKind,
        global: &[usize],
        local: &[usize],
        wait_for: &[HostEvent],
        buffers: Vec<usize>,
        work: Work,
    ) -> RuntimeResult<HostEvent> {
        let event = HostEvent::new(self.next_event.fetch_add(1, Ordering::SeqCst));
        {
            let mut launches = lock(&self.launches);
            let sequence = launches.len();
            launches.push(LaunchRecord {
                sequence,
                command,
                global: global.to_vec(),
                local: local.to_vec(),
                wait_for: wait_for.iter().map(HostEvent::id).collect(),
                event: event.id,
                buffers,
            });
        }
        let command = Command { event: event.clone(), wait_for: wait_for.to_vec(), work };
        match self.mode {
            ExecutionMode::Immediate => {
                let _drain = lock(&self.drain);
                self.run(command)?;
            }
            ExecutionMode::Deferred => lock(&self.queue).push_back(command),
        }
        Ok(event)
    }

    fn run(&self, command: Command) -> RuntimeResult<()> {
        let Command { event, wait_for, work } = command;
        let result = match wait_for.iter().find(|dep| dep.status() != EventStatus::Complete) {
            Some(dep) => Err(RuntimeError::Execution(format!(
                "event {} depends on event {} which did not complete",
                event.id, dep.id
            ))),
            None => work(),
        };
        match &result {
            Ok(()) => {
                event.set(EventStatus::Complete);
                lock(&self.completed).push(event.id);
            }
            Err(e) => {
                log::warn!("host command {} failed: {e}", event.id);
                event.set(EventStatus::Failed(e.to_string()));
            }
        }
        result
    }

    /// Runs queued commands in order until `until` is done, or the queue is
    /// empty. Returns the first failure among the commands it ran.
    fn drain(&self, until: Option<&HostEvent>) -> RuntimeResult<()> {
        let _drain = lock(&self.drain);
        let mut first_error = None;
        loop {
            if until.is_some_and(|e| e.status() != EventStatus::Pending) {
                break;
            }
            let Some(command) = lock(&self.queue).pop_front() else {
                break;
            };
            if let Err(e) = self.run(command) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) if until.is_none() => Err(e),
            _ => Ok(()),
        }
    }
}

impl Backend for HostBackend {
    type Memory = HostMemory;
    type Program = HostProgram;
    type Kernel = HostKernel;
    type Event = HostEvent;

    fn device(&self) -> &DeviceInfo {
        &self.device
    }

    fn allocate(&self, precision: Precision, len: usize) -> RuntimeResult<HostMemory> {
        if len.checked_mul(precision.element_size()).is_none() {
            return Err(RuntimeError::Allocation { precision, len });
        }
        Ok(HostMemory::new(HostData::zeroed(precision, len)))
    }

    fn memory_size(&self, memory: &HostMemory) -> usize {
        let data = memory.data.read().unwrap_or_else(PoisonError::into_inner);
        data.len() * data.precision().element_size()
    }

    fn program_source(&self, program: &str) -> RuntimeResult<Cow<'static, str>> {
        SOURCES
            .iter()
            .find(|(name, _)| *name == program)
            .map(|(_, source)| Cow::Borrowed(*source))
            .ok_or_else(|| RuntimeError::SourceNotFound(program.to_string()))
    }

    fn compile(&self, source: &str) -> RuntimeResult<HostProgram> {
        self.compilations.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.compile_delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.faults.panic_on_compile.load(Ordering::SeqCst) {
            panic!("host compiler crashed");
        }
        if self.faults.fail_compile.load(Ordering::SeqCst) {
            return Err(RuntimeError::Compile("compilation rejected".to_string()));
        }
        let info = ProgramInfo::parse(source)?;
        log::debug!("host: compiled {} ({} kernels)", info.routine().unwrap_or("?"), info.kernels.len());
        Ok(HostProgram { info: Arc::new(info) })
    }

    fn create_kernel(&self, program: &HostProgram, name: &str) -> RuntimeResult<HostKernel> {
        if !program.info.kernels.iter().any(|k| k == name) {
            return Err(RuntimeError::KernelNotFound(name.to_string()));
        }
        Ok(HostKernel { name: name.to_string(), program: Arc::clone(&program.info) })
    }

    fn enqueue_kernel(
        &self,
        kernel: &HostKernel,
        args: &[KernelArg<'_, Self>],
        global: &[usize],
        local: &[usize],
        wait_for: &[HostEvent],
    ) -> RuntimeResult<HostEvent> {
        if self.faults.panic_on_launch.load(Ordering::SeqCst) {
            panic!("host queue crashed launching {}", kernel.name);
        }
        self.check_geometry(global, local)?;
        let owned: Vec<HostArg> = args
            .iter()
            .map(|arg| match arg {
                KernelArg::Int(v) => HostArg::Int(*v),
                KernelArg::Scalar(s) => HostArg::Scalar(*s),
                KernelArg::Memory(m) => HostArg::Memory((*m).clone()),
            })
            .collect();
        let buffers = owned
            .iter()
            .filter_map(|arg| match arg {
                HostArg::Memory(m) => Some(m.len()),
                _ => None,
            })
            .collect();
        let task = kernel.clone();
        let (g, l) = (global.to_vec(), local.to_vec());
        self.submit(
            CommandKind::Kernel(kernel.name.clone()),
            global,
            local,
            wait_for,
            buffers,
            Box::new(move || kernels::execute(&task, &owned, &g, &l)),
        )
    }

    fn enqueue_copy(
        &self,
        src: &HostMemory,
        src_offset: usize,
        dst: &HostMemory,
        dst_offset: usize,
        len: usize,
        wait_for: &[HostEvent],
    ) -> RuntimeResult<HostEvent> {
        let (src, dst) = (src.clone(), dst.clone());
        self.submit(
            CommandKind::Copy { len },
            &[],
            &[],
            wait_for,
            vec![src.len(), dst.len()],
            Box::new(move || {
                // read first so that copying within one buffer cannot deadlock
                let from = src.cloned();
                let mut to = dst.data.write().unwrap_or_else(PoisonError::into_inner);
                if to.copy_from(dst_offset, &from, src_offset, len) {
                    Ok(())
                } else {
                    Err(RuntimeError::Execution(format!(
                        "copy of {len} elements from buffer {} at {src_offset} to buffer {} at {dst_offset} is out of range",
                        src.id, dst.id
                    )))
                }
            }),
        )
    }

    fn wait(&self, event: &HostEvent) -> RuntimeResult<()> {
        self.drain(Some(event))?;
        match event.status() {
            EventStatus::Complete => Ok(()),
            EventStatus::Failed(msg) => Err(RuntimeError::Execution(msg)),
            EventStatus::Pending => Err(RuntimeError::Execution(format!("event {} was never enqueued here", event.id))),
        }
    }

    fn finish(&self) -> RuntimeResult<()> {
        self.drain(None)
    }
}
