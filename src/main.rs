#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod kernel_image {
    extern crate rlibc;

    use core::arch::global_asm;
    use core::panic::PanicInfo;

    use chime::arch::{Cpu, HardwareCpu};
    use chime::devices::drivers::{Arrow, Key};
    use chime::devices::sound::notes::{BOOT_CHIME, ODE_TO_JOY};
    use chime::devices::{self, KEYBOARD};
    use chime::{print, println, test_env};

    const MULTIBOOT2_BOOTLOADER_MAGIC: u32 = 0x36D7_6289;

    // Multiboot2 header, a 64 KiB boot stack, and the entry point. GRUB hands
    // over in 32-bit protected mode with flat segments, EAX = magic and
    // EBX = physical address of the boot information.
    global_asm!(
        r#"
        .section .multiboot_header, "a"
        .balign 8
    2:
        .long 0xE85250D6
        .long 0
        .long 3f - 2b
        .long 0x100000000 - (0xE85250D6 + (3f - 2b))
        .short 0
        .short 0
        .long 8
    3:

        .section .bss
        .balign 16
    chime_boot_stack_bottom:
        .skip 65536
    chime_boot_stack_top:

        .section .text
        .global _start
    _start:
        mov esp, offset chime_boot_stack_top
        push ebx
        push eax
        call kernel_main
    4:
        cli
        hlt
        jmp 4b
        "#
    );

    #[no_mangle]
    pub extern "C" fn kernel_main(magic: u32, _boot_info: u32) -> ! {
        if let Err(e) = chime::init() {
            println!("Kernel initialization failed: {}", e);
            HardwareCpu::halt_forever();
        }
        if magic != MULTIBOOT2_BOOTLOADER_MAGIC {
            log::warn!("unexpected boot magic {:#010x}", magic);
        }

        test_env::run_all();
        devices::play_song(&BOOT_CHIME);

        println!("Type away; 'p' plays {}.", ODE_TO_JOY.name());
        loop {
            while let Some(key) = KEYBOARD.try_read_key() {
                echo(key);
            }
            HardwareCpu.enable_interrupts_and_halt();
        }
    }

    fn echo(key: Key) {
        match key {
            Key::Char('p') => devices::play_song(&ODE_TO_JOY),
            Key::Char(c) => print!("{}", c),
            Key::Arrow(Arrow::Up) => print!("<up>"),
            Key::Arrow(Arrow::Down) => print!("<down>"),
            Key::Arrow(Arrow::Left) => print!("<left>"),
            Key::Arrow(Arrow::Right) => print!("<right>"),
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        unsafe { chime::serial::force_unlock() };
        println!("KERNEL PANIC: {}", info);
        HardwareCpu::halt_forever()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
