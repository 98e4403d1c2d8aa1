//! C FFI bindings for Nestbox
//!
//! Leaves and composites are handed to C as opaque pointers to heap storage
//! obtained from the process-wide runtime. Every function tolerates NULL
//! handles the way the component API tolerates absence: mutators and `init`
//! do nothing, getters return zero. `*_free` takes the address of the
//! handle, releases the storage and clears the handle, so a second call is
//! a no-op.
//!
//! # Safety
//!
//! All functions in this module are unsafe because they:
//! - Dereference raw pointers passed from C
//! - Require the caller to ensure pointer validity and proper cleanup
//! - May write to caller-provided output pointers

#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use nestbox::{Composite, HeapCell, Leaf, NestboxOptions, NestboxRuntime, Ownership, Slot};
use nestbox_shared::errors::{NestboxError, NestboxResult};

// ============================================================================
// Error Code Enum - Maps to NestboxError variants
// ============================================================================

/// Error codes returned by Nestbox C API functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestboxErrorCode {
    /// Operation succeeded
    Ok = 0,
    /// The allocator refused a request
    AllocationFailure = 1,
    /// Configuration before init under the strict policy
    UseBeforeInit = 2,
    /// Explicit release of an injected leaf
    ForeignOwnership = 3,
    /// Invalid state for operation
    InvalidState = 4,
    /// Invalid argument provided
    InvalidArgument = 5,
    /// Configuration error
    Config = 6,
}

/// Extended error information for C API.
#[repr(C)]
pub struct CNestboxError {
    /// Error code
    pub code: NestboxErrorCode,
    /// Detailed error message (NULL if none, caller must free with nestbox_error_free)
    pub message: *mut c_char,
}

impl Default for CNestboxError {
    fn default() -> Self {
        CNestboxError {
            code: NestboxErrorCode::Ok,
            message: ptr::null_mut(),
        }
    }
}

/// Who frees a composite's referenced leaf.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestboxOwnership {
    /// No referenced leaf
    None = 0,
    /// Freed together with the composite
    Owned = 1,
    /// Injected; the caller frees it
    Borrowed = 2,
}

/// Opaque handle to a heap-allocated leaf
pub struct NestboxLeaf {
    _opaque: [u8; 0],
}

/// Opaque handle to a heap-allocated composite
pub struct NestboxComposite {
    _opaque: [u8; 0],
}

// ============================================================================
// Runtime
// ============================================================================

static RUNTIME: OnceLock<NestboxRuntime> = OnceLock::new();

/// Process-wide runtime; created from the environment on first use unless
/// `nestbox_init` ran earlier.
fn runtime() -> &'static NestboxRuntime {
    RUNTIME.get_or_init(|| {
        let options = NestboxOptions::default().with_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring environment options: {}", e);
            NestboxOptions::default()
        });
        NestboxRuntime::new(options)
    })
}

// ============================================================================
// Error Conversion Helpers
// ============================================================================

fn error_to_code(err: &NestboxError) -> NestboxErrorCode {
    match err {
        NestboxError::AllocationFailure(_) => NestboxErrorCode::AllocationFailure,
        NestboxError::UseBeforeInit(_) => NestboxErrorCode::UseBeforeInit,
        NestboxError::ForeignOwnership(_) => NestboxErrorCode::ForeignOwnership,
        NestboxError::InvalidState(_) => NestboxErrorCode::InvalidState,
        NestboxError::InvalidArgument(_) => NestboxErrorCode::InvalidArgument,
        NestboxError::Config(_) => NestboxErrorCode::Config,
    }
}

fn error_to_c_error(err: NestboxError) -> CNestboxError {
    let code = error_to_code(&err);
    let message = error_to_c_string(err);
    CNestboxError { code, message }
}

/// Write error to output parameter (if not NULL)
fn write_error(out_error: *mut CNestboxError, err: NestboxError) {
    tracing::debug!(kind = err.kind(), "Returning error to C caller: {}", err);
    if !out_error.is_null() {
        unsafe {
            *out_error = error_to_c_error(err);
        }
    }
}

fn null_pointer_error(param_name: &str) -> NestboxError {
    NestboxError::InvalidArgument(format!("{} is null", param_name))
}

fn error_to_c_string(err: NestboxError) -> *mut c_char {
    match CString::new(err.to_string()) {
        Ok(s) => s.into_raw(),
        Err(_) => CString::from(c"Failed to format error message").into_raw(),
    }
}

unsafe fn c_str_to_string(s: *const c_char) -> NestboxResult<String> {
    if s.is_null() {
        return Err(null_pointer_error("string"));
    }
    CStr::from_ptr(s)
        .to_str()
        .map(|s| s.to_string())
        .map_err(|e| NestboxError::InvalidArgument(format!("invalid UTF-8: {}", e)))
}

/// Collapse a result into a return code, filling `out_error` on failure.
fn report(result: NestboxResult<()>, out_error: *mut CNestboxError) -> NestboxErrorCode {
    match result {
        Ok(()) => NestboxErrorCode::Ok,
        Err(e) => {
            let code = error_to_code(&e);
            write_error(out_error, e);
            code
        }
    }
}

unsafe fn leaf_ref<'a>(leaf: *const NestboxLeaf) -> Option<&'a Leaf> {
    leaf.cast::<Leaf>().as_ref()
}

unsafe fn leaf_mut<'a>(leaf: *mut NestboxLeaf) -> Option<&'a mut Leaf> {
    leaf.cast::<Leaf>().as_mut()
}

// ============================================================================
// Library
// ============================================================================

/// Get Nestbox version string
///
/// # Returns
/// Static string containing the version (e.g., "0.1.0")
#[unsafe(no_mangle)]
pub extern "C" fn nestbox_version() -> *const c_char {
    // Static string, safe to return pointer
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Configure the process-wide runtime.
///
/// Must run before any other allocation call. Environment variables
/// (`NESTBOX_INIT_POLICY`, `NESTBOX_ALLOCATION_BUDGET`) override the JSON.
///
/// # Arguments
/// * `options_json` - e.g. `{"init_policy": "strict", "allocation_budget": 8}`;
///                    NULL for defaults
/// * `out_error` - Output parameter for error information
///
/// # Returns
/// `Ok`, `Config` for bad options, or `InvalidState` if the runtime was
/// already set up (explicitly or by an earlier allocation).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_init(
    options_json: *const c_char,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    let options = if options_json.is_null() {
        Ok(NestboxOptions::default())
    } else {
        c_str_to_string(options_json).and_then(|json| NestboxOptions::from_json(&json))
    };

    let result = options
        .and_then(NestboxOptions::with_env)
        .and_then(|options| {
            RUNTIME
                .set(NestboxRuntime::new(options))
                .map_err(|_| NestboxError::InvalidState("runtime already initialized".into()))
        });
    report(result, out_error)
}

// ============================================================================
// Leaf
// ============================================================================

/// Allocate a zero-state leaf.
///
/// # Returns
/// Leaf handle, or NULL if allocation failed (details in `out_error`)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_malloc(out_error: *mut CNestboxError) -> *mut NestboxLeaf {
    match runtime().allocate_leaf() {
        Ok(cell) => cell.into_raw().as_ptr().cast(),
        Err(e) => {
            write_error(out_error, e);
            ptr::null_mut()
        }
    }
}

/// Initialize with `x = 0`, `y = 1.0`. NULL is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_init(leaf: *mut NestboxLeaf) {
    if let Some(leaf) = leaf_mut(leaf) {
        leaf.init();
    }
}

/// Initialize with a caller-supplied `x`. NULL is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_init_with_x(leaf: *mut NestboxLeaf, x: c_int) {
    if let Some(leaf) = leaf_mut(leaf) {
        leaf.init_with_x(x);
    }
}

/// Set `x`. Before init this does nothing, or returns `UseBeforeInit`
/// under the strict policy.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_set_x(
    leaf: *mut NestboxLeaf,
    x: c_int,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match leaf_mut(leaf) {
        Some(leaf) => report(leaf.set_x(x), out_error),
        None => NestboxErrorCode::Ok,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_set_y(
    leaf: *mut NestboxLeaf,
    y: f32,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match leaf_mut(leaf) {
        Some(leaf) => report(leaf.set_y(y), out_error),
        None => NestboxErrorCode::Ok,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_set_x_y(
    leaf: *mut NestboxLeaf,
    x: c_int,
    y: f32,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match leaf_mut(leaf) {
        Some(leaf) => report(leaf.set_x_y(x, y), out_error),
        None => NestboxErrorCode::Ok,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_x(leaf: *const NestboxLeaf) -> c_int {
    leaf_ref(leaf).map_or(0, Leaf::x)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_y(leaf: *const NestboxLeaf) -> f32 {
    leaf_ref(leaf).map_or(0.0, Leaf::y)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_is_initialized(leaf: *const NestboxLeaf) -> bool {
    leaf_ref(leaf).is_some_and(Leaf::is_initialized)
}

/// Free a leaf and clear the caller's handle.
///
/// NULL, or a handle already cleared by an earlier call, is ignored.
/// A leaf injected into a composite must outlive that composite.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_leaf_free(leaf: *mut *mut NestboxLeaf) {
    if leaf.is_null() {
        return;
    }
    if let Some(ptr) = NonNull::new((*leaf).cast::<Leaf>()) {
        drop(HeapCell::from_raw(ptr, runtime().allocator().clone()));
        *leaf = ptr::null_mut();
    }
}

// ============================================================================
// Composite
// ============================================================================

/// What a `NestboxComposite` handle points at.
///
/// An injected leaf is kept as a raw pointer and only dereferenced for the
/// duration of one call, so the C caller may keep using its own handle to
/// that leaf (e.g. `nestbox_leaf_set_y`) while it is injected.
struct CompositeHandle {
    composite: Composite<'static>,
    injected: Option<NonNull<Leaf>>,
}

impl CompositeHandle {
    /// Allocate the handle, then (if asked) its owned referenced leaf.
    ///
    /// A failed leaf allocation releases the handle before returning.
    fn allocate(runtime: &NestboxRuntime, with_leaf: bool) -> NestboxResult<HeapCell<Self>> {
        let handle = CompositeHandle {
            composite: runtime.composite(),
            injected: None,
        };
        let mut handle = HeapCell::new_in(handle, runtime.allocator().clone())?;
        if with_leaf {
            let leaf = runtime.allocate_leaf().inspect_err(|e| {
                tracing::warn!(
                    kind = e.kind(),
                    "Referenced leaf allocation failed, rolling back composite"
                );
            })?;
            handle.composite.adopt(&mut Slot::from(leaf))?;
        }
        Ok(handle)
    }

    fn ownership(&self) -> Option<Ownership> {
        match self.injected {
            Some(_) => Some(Ownership::Borrowed),
            None => self.composite.ownership(),
        }
    }

    /// # Safety
    /// An injected pointer must still be valid.
    unsafe fn referenced(&self) -> Option<&Leaf> {
        match self.injected {
            Some(leaf) => Some(leaf.as_ref()),
            None => self.composite.referenced(),
        }
    }

    fn init_with_leaf(&mut self, leaf: NonNull<Leaf>) -> NestboxResult<()> {
        if let Some(ownership) = self.ownership() {
            return Err(NestboxError::InvalidState(format!(
                "referenced leaf already present ({:?})",
                ownership
            )));
        }
        self.injected = Some(leaf);
        // No owned leaf, so this initializes the inline leaf only
        self.composite.init();
        Ok(())
    }

    /// # Safety
    /// An injected pointer must still be valid and not borrowed elsewhere.
    unsafe fn set_referenced_x(&mut self, x: c_int) -> NestboxResult<()> {
        match self.injected {
            Some(mut leaf) => {
                if self.composite.admit_configuration("set_referenced_x")? {
                    leaf.as_mut().set_x(x)?;
                }
                Ok(())
            }
            None => self.composite.set_referenced_x(x),
        }
    }

    fn release_referenced(&mut self) -> NestboxResult<bool> {
        if self.injected.is_some() {
            return Err(NestboxError::ForeignOwnership(
                "referenced leaf was injected and belongs to its injector".into(),
            ));
        }
        self.composite.release_referenced()
    }
}

unsafe fn handle_ref<'a>(composite: *const NestboxComposite) -> Option<&'a CompositeHandle> {
    composite.cast::<CompositeHandle>().as_ref()
}

unsafe fn handle_mut<'a>(composite: *mut NestboxComposite) -> Option<&'a mut CompositeHandle> {
    composite.cast::<CompositeHandle>().as_mut()
}

fn composite_into_c(
    result: NestboxResult<HeapCell<CompositeHandle>>,
    out_error: *mut CNestboxError,
) -> *mut NestboxComposite {
    match result {
        Ok(cell) => cell.into_raw().as_ptr().cast(),
        Err(e) => {
            write_error(out_error, e);
            ptr::null_mut()
        }
    }
}

/// Allocate a composite together with its owned referenced leaf.
///
/// Neither is initialized. If either allocation fails nothing stays
/// allocated.
///
/// # Returns
/// Composite handle, or NULL on failure (details in `out_error`)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_malloc(
    out_error: *mut CNestboxError,
) -> *mut NestboxComposite {
    composite_into_c(CompositeHandle::allocate(runtime(), true), out_error)
}

/// Allocate a composite without a referenced leaf, for
/// `nestbox_composite_init_with_leaf`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_malloc_detached(
    out_error: *mut CNestboxError,
) -> *mut NestboxComposite {
    composite_into_c(CompositeHandle::allocate(runtime(), false), out_error)
}

/// Initialize the inline leaf and an owned referenced leaf. NULL is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_init(composite: *mut NestboxComposite) {
    if let Some(handle) = handle_mut(composite) {
        handle.composite.init();
    }
}

/// Inject an externally owned leaf and initialize the composite.
///
/// The leaf is not initialized here; that is the injector's job. The
/// composite never frees it. The caller may keep configuring the leaf
/// through its own handle.
///
/// # Safety
/// `leaf` must stay valid, and must not be freed, until `composite` has
/// been freed. Calls on the two handles must not run concurrently.
///
/// # Returns
/// `Ok`, `InvalidArgument` if `leaf` is NULL, or `InvalidState` if the
/// composite already has a referenced leaf.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_init_with_leaf(
    composite: *mut NestboxComposite,
    leaf: *mut NestboxLeaf,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    let Some(handle) = handle_mut(composite) else {
        return NestboxErrorCode::Ok;
    };
    let Some(leaf) = NonNull::new(leaf.cast::<Leaf>()) else {
        return report(Err(null_pointer_error("leaf")), out_error);
    };
    report(handle.init_with_leaf(leaf), out_error)
}

/// Set `x` of the inline leaf.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_set_a0_x(
    composite: *mut NestboxComposite,
    x: c_int,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match handle_mut(composite) {
        Some(handle) => report(handle.composite.set_inline_x(x), out_error),
        None => NestboxErrorCode::Ok,
    }
}

/// Set `x` of the referenced leaf; no-op if there is none.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_set_a1_x(
    composite: *mut NestboxComposite,
    x: c_int,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match handle_mut(composite) {
        Some(handle) => report(handle.set_referenced_x(x), out_error),
        None => NestboxErrorCode::Ok,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_a0_x(composite: *const NestboxComposite) -> c_int {
    handle_ref(composite).map_or(0, |h| h.composite.inline().x())
}

/// `x` of the referenced leaf, 0 if the composite or the leaf is absent.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_a1_x(composite: *const NestboxComposite) -> c_int {
    match handle_ref(composite) {
        Some(handle) => handle.referenced().map_or(0, Leaf::x),
        None => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_ownership(
    composite: *const NestboxComposite,
) -> NestboxOwnership {
    match handle_ref(composite).and_then(CompositeHandle::ownership) {
        None => NestboxOwnership::None,
        Some(Ownership::Owned) => NestboxOwnership::Owned,
        Some(Ownership::Borrowed) => NestboxOwnership::Borrowed,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_is_initialized(
    composite: *const NestboxComposite,
) -> bool {
    handle_ref(composite).is_some_and(|h| h.composite.is_initialized())
}

/// Free the composite's owned referenced leaf now.
///
/// # Returns
/// `Ok` (also when there was nothing to free), or `ForeignOwnership` if
/// the leaf was injected; it is left in place.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_release_leaf(
    composite: *mut NestboxComposite,
    out_error: *mut CNestboxError,
) -> NestboxErrorCode {
    match handle_mut(composite) {
        Some(handle) => report(handle.release_referenced().map(|_| ()), out_error),
        None => NestboxErrorCode::Ok,
    }
}

/// Free a composite and its owned referenced leaf, and clear the handle.
///
/// An injected leaf is left alone. NULL or an already cleared handle is
/// ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_composite_free(composite: *mut *mut NestboxComposite) {
    if composite.is_null() {
        return;
    }
    if let Some(ptr) = NonNull::new((*composite).cast::<CompositeHandle>()) {
        drop(HeapCell::from_raw(ptr, runtime().allocator().clone()));
        *composite = ptr::null_mut();
    }
}

/// Free error struct
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nestbox_error_free(error: *mut CNestboxError) {
    if !error.is_null() {
        let err = &mut *error;
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
            err.message = ptr::null_mut();
        }
        err.code = NestboxErrorCode::Ok;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
