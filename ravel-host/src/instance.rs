//! One loaded solver module instance.
//!
//! A [`SolverInstance`] owns a store, an instantiated module, and the
//! typed entry points. Its [`invoke`] method is the marshaling
//! protocol: encode the input into module memory, point a descriptor
//! at it, call `solve`, and decode whatever the module left behind the
//! same descriptor.
//!
//! # Buffer ownership
//!
//! - The 8-byte descriptor is allocated and released by the host.
//! - The input buffer is allocated and filled by the host; ownership
//!   transfers to the module when `solve` is entered, and the module
//!   releases it.
//! - The result buffer is allocated by the module from its own
//!   allocator; ownership transfers to the host when `solve` returns,
//!   and the host releases it after decoding.
//!
//! [`invoke`]: SolverInstance::invoke

use crate::memory::{AllocScope, Descriptor, DESCRIPTOR_SIZE, MemoryBridge, WasmPtr};
use crate::runtime::{CompiledModule, SolverRuntime};
use ravel_core::{Outcome, RavelError, Result, Selector};
use wasmtime::{Linker, Store, StoreLimits, TypedFunc};

/// Per-store state: only the resource limits.
pub(crate) struct HostState {
    limits: StoreLimits,
}

/// An instantiated solver module with its private linear memory.
///
/// Not thread-safe by design: an instance lives on exactly one channel
/// worker, and its memory is touched by exactly one invocation at a
/// time.
pub struct SolverInstance {
    /// Channel name, for log correlation.
    name: String,
    /// The store holding this instance's memory and state.
    store: Store<HostState>,
    /// The instantiated module, kept only for test export probes.
    #[cfg(test)]
    instance: wasmtime::Instance,
    /// Bridge over the exported memory and allocator.
    bridge: MemoryBridge<HostState>,
    /// The module's `solve(selector: u32, descriptor: u32) -> i32` export.
    solve_fn: TypedFunc<(u32, u32), i32>,
}

impl SolverInstance {
    /// Instantiate a compiled module and resolve its required exports.
    pub fn new(
        runtime: &SolverRuntime,
        module: &CompiledModule,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let state = HostState {
            limits: runtime.config().store_limits(),
        };
        let mut store = Store::new(runtime.engine(), state);
        store.limiter(|state| &mut state.limits);

        if let Some(fuel) = runtime.initial_fuel() {
            store.set_fuel(fuel).map_err(|e| RavelError::ModuleLoad {
                module: name.clone(),
                cause: format!("failed to set fuel: {e}"),
            })?;
        }

        // The solver module imports nothing; an empty linker suffices.
        let linker: Linker<HostState> = Linker::new(runtime.engine());
        let instance =
            linker
                .instantiate(&mut store, module.module())
                .map_err(|e| RavelError::ModuleLoad {
                    module: name.clone(),
                    cause: format!("instantiation failed: {e}"),
                })?;

        let memory =
            instance
                .get_memory(&mut store, "memory")
                .ok_or_else(|| RavelError::MissingExport {
                    export: "memory".to_string(),
                    cause: "module does not export a linear memory".to_string(),
                })?;

        let alloc_fn: TypedFunc<u32, u32> = instance
            .get_typed_func(&mut store, "alloc")
            .map_err(|e| RavelError::MissingExport {
                export: "alloc".to_string(),
                cause: e.to_string(),
            })?;

        let dealloc_fn: TypedFunc<(u32, u32), ()> = instance
            .get_typed_func(&mut store, "dealloc")
            .map_err(|e| RavelError::MissingExport {
                export: "dealloc".to_string(),
                cause: e.to_string(),
            })?;

        let solve_fn: TypedFunc<(u32, u32), i32> = instance
            .get_typed_func(&mut store, "solve")
            .map_err(|e| RavelError::MissingExport {
                export: "solve".to_string(),
                cause: e.to_string(),
            })?;

        tracing::debug!(channel = %name, "solver module instantiated");

        Ok(Self {
            name,
            store,
            #[cfg(test)]
            instance,
            bridge: MemoryBridge::new(memory, alloc_fn, dealloc_fn),
            solve_fn,
        })
    }

    /// Run one computation through the module.
    ///
    /// Returns `Success`/`Failure` per the module's reported status, or
    /// an error for anything that kept the module from reporting at
    /// all (trap, allocation failure, bad result bytes). A failed
    /// invocation leaves the instance usable for the next one.
    pub fn invoke(&mut self, selector: Selector, input: &str) -> Result<Outcome> {
        let mut scope = AllocScope::new();
        let result = self.invoke_inner(selector, input, &mut scope);
        // Host-owned regions are returned on the trap path too.
        scope.release_all(&mut self.store, &self.bridge);
        result
    }

    fn invoke_inner(
        &mut self,
        selector: Selector,
        input: &str,
        scope: &mut AllocScope,
    ) -> Result<Outcome> {
        let descriptor_addr = self.bridge.allocate(&mut self.store, DESCRIPTOR_SIZE)?;
        scope.track(WasmPtr::new(descriptor_addr, DESCRIPTOR_SIZE));

        let input_buf = self.bridge.copy_in(&mut self.store, input.as_bytes())?;
        scope.track(input_buf);

        self.bridge.write_descriptor(
            &mut self.store,
            descriptor_addr,
            Descriptor {
                ptr: input_buf.offset,
                len: input_buf.len,
            },
        )?;

        tracing::trace!(
            channel = %self.name,
            %selector,
            input_len = input_buf.len,
            "invoking solver"
        );

        // Ownership of the input buffer passes to the module here; the
        // module releases it, even if `solve` later traps.
        scope.forget(input_buf);
        let status = self
            .solve_fn
            .call(&mut self.store, (selector.raw(), descriptor_addr))
            .map_err(|e| RavelError::ModuleTrap {
                selector,
                cause: e.to_string(),
            })?;

        // The descriptor now describes the result buffer, which lies in
        // module-chosen memory, never assume it is the input buffer.
        let out = self.bridge.read_descriptor(&self.store, descriptor_addr)?;
        scope.track(out.payload());
        let message = self.bridge.read_string(&self.store, out.payload())?;

        Ok(Outcome::from_status(status != 0, message))
    }

    /// The channel name this instance belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current size of the module's linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.bridge.size(&self.store)
    }

    /// Read the fixture module's live-allocation counter.
    ///
    /// Test fixtures export `live_allocations() -> i32`; this is how
    /// tests observe allocator balance without widening the ABI.
    #[cfg(test)]
    pub(crate) fn live_allocations(&mut self) -> i32 {
        let probe: TypedFunc<(), i32> = self
            .instance
            .get_typed_func(&mut self.store, "live_allocations")
            .expect("fixture must export live_allocations");
        probe
            .call(&mut self.store, ())
            .expect("live_allocations probe trapped")
    }
}
