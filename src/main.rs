use std::env::set_var;
use std::fs;
use std::process::Stdio;
use clap::{arg, command, ArgAction};
use anyhow::{anyhow, Result};
use disk_driver::file::FileDiskDriver;
use execute::Execute;
use fork::{fork, Fork};
use nix::sys::signal;
use retry::delay::Fixed;
use retry::{retry_with_index, OperationResult};
use log::*;
use fuser::MountOption;
use ext2dir::ext2::desc::Ext2SuperBlock;
use ext2dir::ext2::utils::init_logs;
use ext2dir::ext2::Ext2Fs;
use ext2dir::{DEVICE_FILE, FORCE_FORMAT, MKFS_FORMAT, MOUNT_POINT};

/// Page/block size this binary formats and mounts with. Multi-block-group
/// layouts and a configurable block size are outside this subsystem's scope.
const PAGE_SIZE: u32 = 4096;

fn main() -> Result<()> {
    let matches = command!()
        .arg(arg!([mountpoint] "Optional mountpoint to mount on").default_value("tests/mnt"))
        .arg(
            arg!(-f --front "Keep daemon running in front")
                .action(ArgAction::SetTrue)
                .required(false),
        )
        .arg(
            arg!(--format "Format disk")
                .action(ArgAction::SetTrue)
                .required(false),
        )
        .arg(
            arg!(--mkfs "Use mkfs.ext2 to format disk")
                .action(ArgAction::SetTrue)
                .required(false),
        )
        .arg(
            arg!(-r --read_only "Mount as read only filesystem")
                .action(ArgAction::SetTrue)
                .required(false),
        )
        .arg(
            arg!(-v --verbose "Print more debug information, or set `RUST_LOG=debug`")
                .action(ArgAction::SetTrue)
                .required(false),
        )
        .arg(
            arg!(-d --device <FILE> "Device path (filesystem storage file)")
                .required(false)
                .default_value("ddriver"),
        )
        .get_matches();

    if matches.get_flag("verbose") {
        set_var("RUST_LOG", "debug");
    }
    init_logs();
    let mountpoint = matches.get_one::<String>("mountpoint").unwrap();
    let device = matches.get_one::<String>("device").unwrap();
    let path_mountpoint = fs::canonicalize(mountpoint)?;
    let abspath_mountpoint = path_mountpoint.to_str().unwrap();
    info!("Device: {}", device);
    DEVICE_FILE.set(device.clone()).unwrap();

    MOUNT_POINT.set(abspath_mountpoint.to_string()).unwrap();
    FORCE_FORMAT.set(matches.get_flag("format")).unwrap();
    MKFS_FORMAT.set(matches.get_flag("mkfs")).unwrap();

    macro_rules! umount {
        () => {{
            use log::*;
            info!("Unmounting {}", MOUNT_POINT.read().unwrap().clone());
            let mut command = execute::command_args!(
                "fusermount",
                "-u",
                MOUNT_POINT.read().unwrap().clone()
            );
            command.stdout(Stdio::piped());
            let output = command.execute_output().unwrap();
            info!(
                "fusermount output: {}",
                String::from_utf8(output.stdout).unwrap()
            );
        }};
    }

    pub extern "C" fn signal_handler(_: i32) {
        unsafe {
            println!("[{}] Received signal and will umount.", libc::getpid());
        }
        umount!();
        unsafe {
            println!("[{}] All Done.", libc::getpid());
        }
        std::process::exit(0);
    }

    let sig_action = signal::SigAction::new(
        signal::SigHandler::Handler(signal_handler),
        signal::SaFlags::SA_NODEFER,
        signal::SigSet::empty(),
    );
    unsafe {
        match signal::sigaction(signal::SIGINT, &sig_action) {
            Ok(_) => {}
            Err(e) => {
                println!("SIGINT signal set failed, {:?}", e);
            }
        }
    }

    let read_only = matches.get_flag("read_only");
    let options = vec![
        if read_only { MountOption::RO } else { MountOption::RW },
        MountOption::FSName("ext2dir".to_string()),
    ];
    let retry_times = 3;
    match if matches.get_flag("front") {
        Ok(Fork::Child)
    } else {
        fork()
    } {
        Ok(Fork::Parent(child)) => {
            info!("Daemon running at pid: {}", child);
            Ok(())
        }
        Ok(Fork::Child) => {
            match retry_with_index(Fixed::from_millis(100), |current_try| {
                info!(
                    "[try {}/{}] Mount to {}",
                    current_try, retry_times, abspath_mountpoint
                );
                let sb = Ext2SuperBlock {
                    s_inodes_count: 4096,
                    s_log_block_size: 2, // 4 KiB blocks
                    ..Default::default()
                };
                let fs = Ext2Fs::format(FileDiskDriver::new(device), &sb, PAGE_SIZE);
                let res = fuser::mount2(fs, abspath_mountpoint, &options);
                match res {
                    Ok(_) => {
                        info!("All Done.");
                        OperationResult::Ok(())
                    }
                    Err(e) => {
                        if current_try > retry_times {
                            OperationResult::Err(format!(
                                "Failed to mount after {} retries! Err: {}",
                                retry_times, e
                            ))
                        } else {
                            umount!();
                            info!("Umount Done.");
                            OperationResult::Retry("Failed to mount, trying to umount...".to_string())
                        }
                    }
                }
            }) {
                Ok(_) => Ok(()),
                Err(e) => Err(anyhow!("Mount failed with {}", e)),
            }
        }
        Err(e) => Err(anyhow!("Fork returns error {}", e)),
    }
}
