use crate::cmd::PortArgs;
use crate::exit::{hci_error, CliResult, SUCCESS};
use crate::output::{print_device_info, DeviceInfoOutput, OutputFormat};

pub fn run(args: PortArgs, format: OutputFormat) -> CliResult<i32> {
    let device = super::probe(&args)?;
    let info = *device.info();
    device
        .remove()
        .map_err(|err| hci_error("close failed", err))?;

    let out = DeviceInfoOutput::new(&args.port.display().to_string(), &info);
    print_device_info(&out, &info, format);
    Ok(SUCCESS)
}
