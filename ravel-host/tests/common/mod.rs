//! Shared fixture: a WAT-assembled solver module implementing the ABI.
//!
//! Mirrors the behavior a real solver compiled to wasm would have:
//! a working allocator, `solve` consuming the input buffer and
//! returning a freshly allocated result buffer through the descriptor.
//!
//! Behavior by selector and input:
//! - empty input: reported failure `"empty input"`
//! - selector 4: reported failure `"selector 4 rejected"`
//! - selector 7: traps (`unreachable`)
//! - anything else: success, message is the decimal digit of the
//!   input's byte length (keep test inputs under 10 bytes)

/// Selector that makes the fixture trap instead of reporting.
pub const TRAP_SELECTOR: u32 = 7;

const FIXTURE_WAT: &str = r#"
(module
  (memory (export "memory") 2)
  (data (i32.const 0) "empty input")
  (data (i32.const 16) "selector 4 rejected")
  (global $bump (mut i32) (i32.const 64))
  (global $live (mut i32) (i32.const 0))

  (func $alloc (export "alloc") (param $n i32) (result i32)
    (local $p i32)
    (if (i32.gt_u (local.get $n) (i32.const 65536)) (then (unreachable)))
    (local.set $p (global.get $bump))
    (global.set $bump
      (i32.and
        (i32.add (i32.add (global.get $bump) (local.get $n)) (i32.const 3))
        (i32.const -4)))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (local.get $p))

  (func $dealloc (export "dealloc") (param $ptr i32) (param $len i32)
    (global.set $live (i32.sub (global.get $live) (i32.const 1)))
    (if (i32.eqz (global.get $live))
      (then (global.set $bump (i32.const 64)))))

  (func (export "live_allocations") (result i32)
    (global.get $live))

  (func (export "solve") (param $sel i32) (param $desc i32) (result i32)
    (local $ptr i32)
    (local $len i32)
    (local $out i32)
    (if (i32.eq (local.get $sel) (i32.const 7)) (then (unreachable)))
    (local.set $ptr (i32.load (local.get $desc)))
    (local.set $len (i32.load (i32.add (local.get $desc) (i32.const 4))))
    (call $dealloc (local.get $ptr) (local.get $len))
    (if (i32.eqz (local.get $len))
      (then
        (local.set $out (call $alloc (i32.const 11)))
        (memory.copy (local.get $out) (i32.const 0) (i32.const 11))
        (i32.store (local.get $desc) (local.get $out))
        (i32.store (i32.add (local.get $desc) (i32.const 4)) (i32.const 11))
        (return (i32.const 0))))
    (if (i32.eq (local.get $sel) (i32.const 4))
      (then
        (local.set $out (call $alloc (i32.const 19)))
        (memory.copy (local.get $out) (i32.const 16) (i32.const 19))
        (i32.store (local.get $desc) (local.get $out))
        (i32.store (i32.add (local.get $desc) (i32.const 4)) (i32.const 19))
        (return (i32.const 0))))
    (local.set $out (call $alloc (i32.const 1)))
    (i32.store8 (local.get $out) (i32.add (i32.const 48) (local.get $len)))
    (i32.store (local.get $desc) (local.get $out))
    (i32.store (i32.add (local.get $desc) (i32.const 4)) (i32.const 1))
    (i32.const 1))
)
"#;

/// Assemble the fixture solver to wasm bytes.
pub fn fixture_wasm() -> Vec<u8> {
    wat::parse_str(FIXTURE_WAT).expect("failed to parse fixture WAT")
}
